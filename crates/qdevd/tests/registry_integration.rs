//! Integration tests for the device registry.
//!
//! These drive the spawned registry through its public handle with a
//! fabricated in-memory admin client, checking the observable contract:
//! what the registry knows after a sequence of events, and which attach and
//! detach operations it issued along the way.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy applies
//! to production code only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use qdev_admin::{AdminClient, AdminError, Assignment, DeviceList};
use qdev_core::{DeviceClass, DeviceEvent, DeviceInfo, DeviceKey, DomainClass, DomainInfo};
use qdevd::config::DaemonConfig;
use qdevd::registry::{spawn_registry, RegistryHandle};

// ============================================================================
// Fabricated Admin Client
// ============================================================================

#[derive(Default)]
struct ScriptedAdmin {
    domains: Mutex<Vec<DomainInfo>>,
    listings: Mutex<HashMap<(String, DeviceClass), DeviceList>>,
    calls: Mutex<Vec<String>>,
    fail_detach: Mutex<bool>,
    fail_attach: Mutex<bool>,
}

impl ScriptedAdmin {
    fn with_running(names: &[&str]) -> Arc<Self> {
        let admin = Self::default();
        {
            let mut domains = admin.domains.lock().unwrap();
            for name in names {
                domains.push(DomainInfo::new(*name, DomainClass::AppVm, true));
            }
        }
        Arc::new(admin)
    }

    /// Sets the device listing one domain reports for one class.
    fn list(&self, domain: &str, class: DeviceClass, devices: Vec<DeviceInfo>) {
        self.listings
            .lock()
            .unwrap()
            .insert((domain.to_string(), class), DeviceList::Listed(devices));
    }

    /// Makes every listing for `domain` report the domain as destroyed.
    fn destroy_domain(&self, domain: &str) {
        let mut domains = self.domains.lock().unwrap();
        domains.retain(|d| d.name != domain);
        let mut listings = self.listings.lock().unwrap();
        for class in DeviceClass::ALL {
            listings.insert((domain.to_string(), class), DeviceList::DomainGone);
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set_fail_detach(&self, fail: bool) {
        *self.fail_detach.lock().unwrap() = fail;
    }

    fn set_fail_attach(&self, fail: bool) {
        *self.fail_attach.lock().unwrap() = fail;
    }
}

#[async_trait]
impl AdminClient for ScriptedAdmin {
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

    async fn devices(&self, domain: &str, class: DeviceClass) -> Result<DeviceList, AdminError> {
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(&(domain.to_string(), class))
            .cloned()
            .unwrap_or(DeviceList::Listed(Vec::new())))
    }

    async fn attach(&self, frontend: &str, a: &Assignment) -> Result<(), AdminError> {
        if *self.fail_attach.lock().unwrap() {
            return Err(AdminError::CommandFailed {
                program: "qvm-device".to_string(),
                stderr: "simulated attach failure".to_string(),
            });
        }
        assert!(!a.persistent, "the daemon must only use non-persistent assignments");
        self.calls
            .lock()
            .unwrap()
            .push(format!("attach {frontend} {}", a.device_arg()));
        Ok(())
    }

    async fn detach(&self, frontend: &str, a: &Assignment) -> Result<(), AdminError> {
        if *self.fail_detach.lock().unwrap() {
            return Err(AdminError::CommandFailed {
                program: "qvm-device".to_string(),
                stderr: "simulated detach failure".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("detach {frontend} {}", a.device_arg()));
        Ok(())
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

fn disk(ident: &str) -> DeviceInfo {
    DeviceInfo::new(
        DeviceKey::new("sys-usb", ident),
        "USB Mass Storage",
        DeviceClass::Block,
    )
}

async fn spawn(admin: Arc<ScriptedAdmin>) -> RegistryHandle {
    let registry =
        spawn_registry(admin, &DaemonConfig::default()).expect("default config is valid");
    // Barrier: the actor answers queries only after `run` has finished its
    // bootstrap enumeration, so awaiting one here guarantees the bootstrap has
    // observed the initial (empty) listings before the test simulates any
    // hotplug. Without this, the lazily-scheduled bootstrap would instead read
    // listings the test sets afterward and seed those devices, so the ensuing
    // `ListChanged` would see them as already known and never run the policy.
    let _ = registry.all_devices().await;
    registry
}

async fn list_changed(registry: &RegistryHandle, domain: &str) {
    registry
        .dispatch(DeviceEvent::ListChanged {
            domain: domain.to_string(),
            class: DeviceClass::Block,
        })
        .await
        .expect("registry should be running");
}

async fn detached(registry: &RegistryHandle, frontend: &str, ident: &str) {
    registry
        .dispatch(DeviceEvent::Detached {
            domain: frontend.to_string(),
            key: DeviceKey::new("sys-usb", ident),
            class: DeviceClass::Block,
        })
        .await
        .expect("registry should be running");
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn registry_matches_each_domains_latest_report() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "sys-net", "work"]);
    admin.list("sys-usb", DeviceClass::Block, vec![disk("2-1")]);
    admin.list(
        "sys-net",
        DeviceClass::Usb,
        vec![DeviceInfo::new(
            DeviceKey::new("sys-net", "3-1"),
            "LTE modem",
            DeviceClass::Usb,
        )],
    );

    let registry = spawn(admin.clone()).await;
    let devices = registry.all_devices().await;
    assert_eq!(devices.len(), 2, "bootstrap should see both devices");

    // sys-usb now reports a different set; sys-net is untouched
    admin.list("sys-usb", DeviceClass::Block, vec![disk("2-3")]);
    list_changed(&registry, "sys-usb").await;

    let mut keys: Vec<String> = registry
        .all_devices()
        .await
        .iter()
        .map(|r| r.key.to_string())
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["sys-net:3-1", "sys-usb:2-3"]);
}

#[tokio::test]
async fn reconciliation_is_idempotent() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    admin.list("sys-usb", DeviceClass::Block, vec![disk("2-1")]);

    let registry = spawn(admin.clone()).await;
    list_changed(&registry, "sys-usb").await;
    list_changed(&registry, "sys-usb").await;
    list_changed(&registry, "sys-usb").await;

    assert_eq!(registry.all_devices().await.len(), 1);
}

#[tokio::test]
async fn destroyed_domain_reconciles_as_empty() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    admin.list("sys-usb", DeviceClass::Block, vec![disk("2-1")]);

    let registry = spawn(admin.clone()).await;
    assert_eq!(registry.all_devices().await.len(), 1);

    admin.destroy_domain("sys-usb");
    list_changed(&registry, "sys-usb").await;

    assert!(registry.all_devices().await.is_empty());
}

// ============================================================================
// Auto-Attach Policy
// ============================================================================

#[tokio::test]
async fn eligible_disk_is_claimed_exactly_once() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    // A whole-disk device appears on the source domain
    admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);
    list_changed(&registry, "sys-usb").await;

    assert_eq!(admin.calls(), vec!["attach work sys-usb:sdb"]);

    // Still listed on subsequent list-changes: the identity is known now,
    // so the policy never fires again for it
    list_changed(&registry, "sys-usb").await;
    list_changed(&registry, "sys-usb").await;
    assert_eq!(admin.calls().len(), 1, "no re-claim while the identity remains known");
}

#[tokio::test]
async fn non_matching_ident_is_not_claimed() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    // A USB port ident does not match the disk-suffix convention
    admin.list("sys-usb", DeviceClass::Block, vec![disk("2-1")]);
    list_changed(&registry, "sys-usb").await;

    assert!(admin.calls().is_empty());
    assert_eq!(registry.all_devices().await.len(), 1, "still tracked, just not claimed");
}

#[tokio::test]
async fn device_from_other_backend_is_not_claimed() {
    let admin = ScriptedAdmin::with_running(&["sys-net", "work"]);
    let registry = spawn(admin.clone()).await;

    admin.list(
        "sys-net",
        DeviceClass::Block,
        vec![DeviceInfo::new(
            DeviceKey::new("sys-net", "sda"),
            "USB Mass Storage",
            DeviceClass::Block,
        )],
    );
    list_changed(&registry, "sys-net").await;

    assert!(admin.calls().is_empty());
}

#[tokio::test]
async fn claim_detaches_current_frontends_before_attaching() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work", "personal"]);
    let registry = spawn(admin.clone()).await;

    admin.list(
        "sys-usb",
        DeviceClass::Block,
        vec![disk("sdb").with_used_by(vec!["personal".to_string()])],
    );
    list_changed(&registry, "sys-usb").await;

    assert_eq!(
        admin.calls(),
        vec!["detach personal sys-usb:sdb", "attach work sys-usb:sdb"]
    );
}

#[tokio::test]
async fn detach_failure_aborts_the_claim() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work", "personal"]);
    let registry = spawn(admin.clone()).await;

    admin.set_fail_detach(true);
    admin.list(
        "sys-usb",
        DeviceClass::Block,
        vec![disk("sdb").with_used_by(vec!["personal".to_string()])],
    );
    list_changed(&registry, "sys-usb").await;

    assert!(admin.calls().is_empty(), "no attach after a failed detach");
    assert_eq!(registry.all_devices().await.len(), 1, "device stays in the registry");
}

#[tokio::test]
async fn attach_failure_is_terminal_for_the_occurrence() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    admin.set_fail_attach(true);
    admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);
    list_changed(&registry, "sys-usb").await;
    assert!(admin.calls().is_empty());

    // The failure is not retried on later list-changes either: the identity
    // is known now
    admin.set_fail_attach(false);
    list_changed(&registry, "sys-usb").await;
    assert!(admin.calls().is_empty());
}

// ============================================================================
// Manual Detach Suppression
// ============================================================================

#[tokio::test]
async fn manual_detach_suppresses_reclaim_while_listed() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);
    list_changed(&registry, "sys-usb").await;
    assert_eq!(admin.calls().len(), 1);

    // Operator pulls the device out of the target VM
    detached(&registry, "work", "sdb").await;

    // Still listed by its backend; repeated reconciliations must not
    // re-claim it
    list_changed(&registry, "sys-usb").await;
    list_changed(&registry, "sys-usb").await;
    assert_eq!(admin.calls().len(), 1);
}

#[tokio::test]
async fn marker_clears_when_device_disappears() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);
    list_changed(&registry, "sys-usb").await;
    detached(&registry, "work", "sdb").await;

    // Unplugged: record and marker both go away
    admin.list("sys-usb", DeviceClass::Block, vec![]);
    list_changed(&registry, "sys-usb").await;
    assert!(registry.all_devices().await.is_empty());

    // Replugged under the same identity: newly observed again, so the
    // policy fires again
    admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);
    list_changed(&registry, "sys-usb").await;

    assert_eq!(
        admin.calls(),
        vec!["attach work sys-usb:sdb", "attach work sys-usb:sdb"]
    );
}

#[tokio::test]
async fn detach_event_for_halted_frontend_is_ignored() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    // "vault" is not running; its detach event must set no marker
    detached(&registry, "vault", "sdb").await;

    admin.list("sys-usb", DeviceClass::Block, vec![disk("sdb")]);
    list_changed(&registry, "sys-usb").await;

    assert_eq!(admin.calls(), vec!["attach work sys-usb:sdb"]);
}

// ============================================================================
// Attach Events
// ============================================================================

#[tokio::test]
async fn attach_event_updates_attachment_cache() {
    let admin = ScriptedAdmin::with_running(&["sys-usb", "work"]);
    let registry = spawn(admin.clone()).await;

    admin.list("sys-usb", DeviceClass::Block, vec![disk("2-1")]);
    list_changed(&registry, "sys-usb").await;

    registry
        .dispatch(DeviceEvent::Attached {
            domain: "work".to_string(),
            device: disk("2-1"),
        })
        .await
        .unwrap();

    let record = registry.device("sys-usb:2-1").await.expect("device known");
    assert!(record.attachments.contains("work"));
}
