//! Registry actor - owns all device state and processes events.
//!
//! The DeviceRegistry is the single owner of device state in the daemon.
//! It receives commands via an mpsc channel, processes them strictly
//! sequentially, and publishes notices via broadcast. Because every event
//! handler runs to completion before the next command is taken, the state
//! needs no locking and the bus's emission order is preserved.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are logged but don't panic

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use qdev_admin::{AdminClient, AdminError, Assignment, DeviceList};
use qdev_core::{DeviceClass, DeviceEvent, DeviceInfo, DeviceKey, DeviceRecord};

use super::commands::{AutoAttachStage, RegistryCommand, RegistryNotice};
use crate::policy::AutoAttachPolicy;

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns all device state.
///
/// # Ownership
///
/// The actor owns:
/// - `devices`: all known device records, keyed by canonical `backend:ident`
/// - `manually_detached`: canonical keys the operator explicitly detached,
///   which suppress auto-attach until the identity is reconciled away
///
/// # Consistency model
///
/// Attach/detach events update the cache incrementally; list-change events
/// trigger a reconciliation that re-reads ground truth for one domain. The
/// reconciliation is the only place records are removed, so the registry
/// converges to the platform's view one domain at a time.
pub struct DeviceRegistry {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Administrative client for enumeration and attach/detach
    admin: Arc<dyn AdminClient>,

    /// Auto-attach decision logic
    policy: AutoAttachPolicy,

    /// Device classes this daemon tracks
    classes: Vec<DeviceClass>,

    /// Canonical key -> record for every known device
    devices: HashMap<String, DeviceRecord>,

    /// Identities the operator explicitly detached
    manually_detached: HashSet<String>,

    /// Notice publisher for subscribers
    notice_publisher: broadcast::Sender<RegistryNotice>,
}

impl DeviceRegistry {
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        admin: Arc<dyn AdminClient>,
        policy: AutoAttachPolicy,
        classes: Vec<DeviceClass>,
        notice_publisher: broadcast::Sender<RegistryNotice>,
    ) -> Self {
        Self {
            receiver,
            admin,
            policy,
            classes,
            devices: HashMap::new(),
            manually_detached: HashSet::new(),
            notice_publisher,
        }
    }

    /// Runs the actor: bulk-seeds the registry, then processes commands
    /// until the channel closes (all senders dropped).
    pub async fn run(mut self) {
        info!("device registry starting");

        if let Err(e) = self.bootstrap().await {
            // A failed bootstrap leaves an empty registry; list-change
            // reconciliations will rebuild the view domain by domain.
            warn!(error = %e, "initial device enumeration failed");
        }

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!(devices = self.devices.len(), "device registry stopped");
    }

    /// Seeds the registry from a full enumeration: every tracked class of
    /// every domain, attachment sets taken from the enumeration's used-by
    /// view.
    async fn bootstrap(&mut self) -> Result<(), AdminError> {
        let domains = self.admin.domains().await?;

        for domain in &domains {
            for class in self.classes.clone() {
                match self.admin.devices(&domain.name, class).await {
                    Ok(DeviceList::Listed(infos)) => {
                        for info in infos {
                            let key = info.key.to_string();
                            self.devices.insert(key, DeviceRecord::from_info(&info));
                        }
                    }
                    Ok(DeviceList::DomainGone) => continue,
                    Err(e) => {
                        warn!(domain = %domain.name, %class, error = %e, "skipping class during bootstrap");
                    }
                }
            }
        }

        info!(devices = self.devices.len(), "initial device enumeration complete");
        Ok(())
    }

    /// Dispatches a command to the appropriate handler.
    async fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Dispatch { event, respond_to } => {
                self.handle_event(event).await;
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(());
            }
            RegistryCommand::GetDevice { key, respond_to } => {
                let _ = respond_to.send(self.devices.get(&key).cloned());
            }
            RegistryCommand::GetAllDevices { respond_to } => {
                let _ = respond_to.send(self.devices.values().cloned().collect());
            }
        }
    }

    async fn handle_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Attached { domain, device } => self.device_attached(domain, device).await,
            DeviceEvent::Detached { domain, key, .. } => self.device_detached(domain, key).await,
            DeviceEvent::ListChanged { domain, .. } => self.reconcile(domain).await,
        }
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    /// A device was attached to a frontend domain: update the cache, creating
    /// the record from the event payload if the device is unknown.
    async fn device_attached(&mut self, domain: String, device: DeviceInfo) {
        if !self.classes.contains(&device.class) {
            return;
        }
        if !self.domain_is_running(&domain).await {
            return;
        }

        let key = device.key.to_string();
        let record = self
            .devices
            .entry(key.clone())
            .or_insert_with(|| DeviceRecord::from_info(&device));
        record.attachments.insert(domain.clone());

        debug!(frontend = %domain, device = %key, "device attached");
    }

    /// A device was detached from a running frontend: mark the identity as
    /// manually detached so auto-attach leaves it alone. The marker is set
    /// unconditionally - including for detaches this daemon issued itself;
    /// the policy only fires for newly observed identities, so its own
    /// detach-then-attach sequence is never suppressed by this.
    async fn device_detached(&mut self, domain: String, key: DeviceKey) {
        if !self.domain_is_running(&domain).await {
            return;
        }

        let key = key.to_string();
        debug!(frontend = %domain, device = %key, "device manually detached");
        self.manually_detached.insert(key);
    }

    /// Resynchronizes the registry for one domain against a freshly observed
    /// device list. Unknown devices are created (and offered to the policy);
    /// devices this domain no longer reports are dropped, together with any
    /// manual-detach marker. Devices backed by other domains are untouched.
    async fn reconcile(&mut self, domain: String) {
        let mut observed: Vec<DeviceInfo> = Vec::new();

        for class in self.classes.clone() {
            match self.admin.devices(&domain, class).await {
                Ok(DeviceList::Listed(infos)) => observed.extend(infos),
                Ok(DeviceList::DomainGone) => {
                    // The domain was destroyed: it now has zero devices and
                    // everything it backed gets dropped below.
                    debug!(domain = %domain, "domain gone, reconciling as empty");
                    observed.clear();
                    break;
                }
                Err(e) => {
                    // A transient enumeration failure must not wipe the
                    // domain's records; retry on the next list-change.
                    warn!(domain = %domain, %class, error = %e, "enumeration failed, skipping reconciliation");
                    return;
                }
            }
        }

        // Record devices this domain newly reports, offering each to the
        // auto-attach policy. Known devices get their attributes refreshed;
        // their attachment sets stay as-is.
        for info in &observed {
            let key = info.key.to_string();
            if let Some(existing) = self.devices.get_mut(&key) {
                existing.refresh(info);
                continue;
            }

            let record = DeviceRecord::from_info(info);
            debug!(domain = %domain, device = %key, "new device");
            self.publish(RegistryNotice::DeviceAdded { key: key.clone() });

            let claim = self.policy.wants(&record, &self.manually_detached);
            self.devices.insert(key, record.clone());
            if claim {
                self.claim(&record).await;
            }
        }

        // Drop devices this domain no longer reports.
        let observed_keys: HashSet<String> =
            observed.iter().map(|info| info.key.to_string()).collect();
        let stale: Vec<String> = self
            .devices
            .values()
            .filter(|record| {
                record.backend_domain() == domain && !observed_keys.contains(&record.key.to_string())
            })
            .map(|record| record.key.to_string())
            .collect();

        for key in stale {
            info!(device = %key, "device removed");
            self.devices.remove(&key);
            self.manually_detached.remove(&key);
            self.publish(RegistryNotice::DeviceRemoved { key });
        }
    }

    // ========================================================================
    // Auto-Attach Execution
    // ========================================================================

    /// Moves a device to the target VM: detach it from every frontend in its
    /// attachment set, then attach it to the target. All assignments are
    /// non-persistent. A detach failure aborts the whole operation; an
    /// attach failure is terminal for this occurrence - no retry.
    async fn claim(&self, record: &DeviceRecord) {
        let key = record.key.to_string();
        let assignment = Assignment::non_persistent(&record.key, record.class);

        for frontend in &record.attachments {
            if let Err(e) = self.admin.detach(frontend, &assignment).await {
                error!(device = %key, frontend = %frontend, error = %e, "auto-attach aborted: detach failed");
                self.publish(RegistryNotice::AutoAttachFailed {
                    key: key.clone(),
                    stage: AutoAttachStage::Detach,
                });
                return;
            }
        }

        let target = self.policy.target_domain();
        match self.admin.attach(target, &assignment).await {
            Ok(()) => {
                info!(device = %key, target = %target, "auto-attached");
                self.publish(RegistryNotice::AutoAttached {
                    key,
                    target: target.to_string(),
                });
            }
            Err(e) => {
                error!(device = %key, target = %target, error = %e, "auto-attach failed in the final step");
                self.publish(RegistryNotice::AutoAttachFailed {
                    key,
                    stage: AutoAttachStage::Attach,
                });
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Ground-truth running check; an unreachable or unknown domain counts
    /// as not running.
    async fn domain_is_running(&self, domain: &str) -> bool {
        match self.admin.is_running(domain).await {
            Ok(running) => running,
            Err(e) => {
                debug!(domain = %domain, error = %e, "running check failed, treating as halted");
                false
            }
        }
    }

    /// Publishes a notice, ignoring the no-subscribers case.
    fn publish(&self, notice: RegistryNotice) {
        let _ = self.notice_publisher.send(notice);
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of devices currently known.
    #[cfg(test)]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Whether the identity carries a manual-detach marker.
    #[cfg(test)]
    pub fn is_manually_detached(&self, key: &str) -> bool {
        self.manually_detached.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use qdev_core::{DomainClass, DomainInfo};

    /// In-memory admin client: fixed domain set, per-(domain, class) device
    /// lists, and a log of attach/detach calls.
    #[derive(Default)]
    struct FakeAdmin {
        domains: Mutex<Vec<DomainInfo>>,
        listings: Mutex<HashMap<(String, DeviceClass), DeviceList>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeAdmin {
        fn with_running(names: &[&str]) -> Self {
            let admin = Self::default();
            {
                let mut domains = admin.domains.lock().unwrap();
                for name in names {
                    domains.push(DomainInfo::new(*name, DomainClass::AppVm, true));
                }
            }
            admin
        }

        fn list(&self, domain: &str, class: DeviceClass, devices: Vec<DeviceInfo>) {
            self.listings
                .lock()
                .unwrap()
                .insert((domain.to_string(), class), DeviceList::Listed(devices));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AdminClient for FakeAdmin {
        async fn domains(&self) -> Result<Vec<DomainInfo>, AdminError> {
            Ok(self.domains.lock().unwrap().clone())
        }

        async fn is_running(&self, domain: &str) -> Result<bool, AdminError> {
            Ok(self
                .domains
                .lock()
                .unwrap()
                .iter()
                .any(|d| d.name == domain && d.running))
        }

        async fn devices(
            &self,
            domain: &str,
            class: DeviceClass,
        ) -> Result<DeviceList, AdminError> {
            Ok(self
                .listings
                .lock()
                .unwrap()
                .get(&(domain.to_string(), class))
                .cloned()
                .unwrap_or(DeviceList::Listed(Vec::new())))
        }

        async fn attach(&self, frontend: &str, a: &Assignment) -> Result<(), AdminError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("attach {frontend} {}", a.device_arg()));
            Ok(())
        }

        async fn detach(&self, frontend: &str, a: &Assignment) -> Result<(), AdminError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("detach {frontend} {}", a.device_arg()));
            Ok(())
        }
    }

    fn create_actor(admin: Arc<FakeAdmin>) -> DeviceRegistry {
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let (notice_tx, _) = broadcast::channel(16);
        let policy =
            AutoAttachPolicy::from_config(&crate::config::DaemonConfig::default()).unwrap();
        DeviceRegistry::new(
            cmd_rx,
            admin,
            policy,
            vec![DeviceClass::Block, DeviceClass::Usb],
            notice_tx,
        )
    }

    fn disk(ident: &str) -> DeviceInfo {
        DeviceInfo::new(
            DeviceKey::new("sys-usb", ident),
            "USB disk",
            DeviceClass::Block,
        )
    }

    #[tokio::test]
    async fn test_bootstrap_records_all_domains() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb", "work"]));
        admin.list("sys-usb", DeviceClass::Block, vec![disk("sda")]);
        admin.list(
            "work",
            DeviceClass::Usb,
            vec![DeviceInfo::new(
                DeviceKey::new("work", "2-1"),
                "mouse",
                DeviceClass::Usb,
            )],
        );

        let mut actor = create_actor(admin);
        actor.bootstrap().await.unwrap();

        assert_eq!(actor.device_count(), 2);
    }

    #[tokio::test]
    async fn test_attach_event_for_halted_domain_ignored() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb"]));
        let mut actor = create_actor(admin);

        actor
            .handle_event(DeviceEvent::Attached {
                domain: "vault".to_string(), // not running
                device: disk("sda"),
            })
            .await;

        assert_eq!(actor.device_count(), 0);
    }

    #[tokio::test]
    async fn test_attach_event_creates_unknown_device() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb", "work"]));
        let mut actor = create_actor(admin);

        actor
            .handle_event(DeviceEvent::Attached {
                domain: "work".to_string(),
                device: disk("sda"),
            })
            .await;

        assert_eq!(actor.device_count(), 1);
    }

    #[tokio::test]
    async fn test_detach_event_for_halted_domain_is_complete_noop() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb"]));
        let mut actor = create_actor(admin);

        actor
            .handle_event(DeviceEvent::Detached {
                domain: "vault".to_string(),
                key: DeviceKey::new("sys-usb", "sda"),
                class: DeviceClass::Block,
            })
            .await;

        assert!(!actor.is_manually_detached("sys-usb:sda"));
        assert_eq!(actor.device_count(), 0);
    }

    #[tokio::test]
    async fn test_untracked_class_ignored() {
        let admin = Arc::new(FakeAdmin::with_running(&["work"]));
        let mut actor = create_actor(admin);

        actor
            .handle_event(DeviceEvent::Attached {
                domain: "work".to_string(),
                device: DeviceInfo::new(
                    DeviceKey::new("dom0", "mic"),
                    "Microphone",
                    DeviceClass::Mic,
                ),
            })
            .await;

        assert_eq!(actor.device_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_claims_new_disk() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb", "work"]));
        admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);

        let mut actor = create_actor(admin.clone());
        actor.reconcile("sys-usb".to_string()).await;

        assert_eq!(actor.device_count(), 1);
        assert_eq!(admin.calls(), vec!["attach work sys-usb:sdb"]);
    }

    #[tokio::test]
    async fn test_reconcile_detaches_current_frontends_first() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb", "work", "personal"]));
        admin.list(
            "sys-usb",
            DeviceClass::Block,
            vec![disk("sdb").with_used_by(vec!["personal".to_string()])],
        );

        let mut actor = create_actor(admin.clone());
        actor.reconcile("sys-usb".to_string()).await;

        assert_eq!(
            admin.calls(),
            vec!["detach personal sys-usb:sdb", "attach work sys-usb:sdb"]
        );
    }

    #[tokio::test]
    async fn test_reconcile_removes_vanished_devices_and_markers() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb", "work"]));
        admin.list("sys-usb", DeviceClass::Block, vec![disk("sda")]);

        let mut actor = create_actor(admin.clone());
        actor.reconcile("sys-usb".to_string()).await;
        actor
            .handle_event(DeviceEvent::Detached {
                domain: "work".to_string(),
                key: DeviceKey::new("sys-usb", "sda"),
                class: DeviceClass::Block,
            })
            .await;
        assert!(actor.is_manually_detached("sys-usb:sda"));

        // Device unplugged: the next list-change no longer reports it
        admin.list("sys-usb", DeviceClass::Block, vec![]);
        actor.reconcile("sys-usb".to_string()).await;

        assert_eq!(actor.device_count(), 0);
        assert!(!actor.is_manually_detached("sys-usb:sda"));
    }

    #[tokio::test]
    async fn test_reconcile_for_one_domain_leaves_others_alone() {
        let admin = Arc::new(FakeAdmin::with_running(&["sys-usb", "sys-net", "work"]));
        admin.list("sys-usb", DeviceClass::Block, vec![disk("sda")]);
        admin.list(
            "sys-net",
            DeviceClass::Usb,
            vec![DeviceInfo::new(
                DeviceKey::new("sys-net", "3-1"),
                "LTE modem",
                DeviceClass::Usb,
            )],
        );

        let mut actor = create_actor(admin.clone());
        actor.reconcile("sys-usb".to_string()).await;
        actor.reconcile("sys-net".to_string()).await;
        assert_eq!(actor.device_count(), 2);

        // sys-usb reports empty; sys-net's device must survive
        admin.list("sys-usb", DeviceClass::Block, vec![]);
        actor.reconcile("sys-usb".to_string()).await;

        assert_eq!(actor.device_count(), 1);
    }
}
