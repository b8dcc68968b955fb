//! Fleet described by an inventory file.
//!
//! Hosts become container nodes whose children are the host's services; each
//! service is a leaf reporting the status declared for it in the file. Loading
//! a changed file updates the inventories, and the tree follows.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::alert_level::AlertLevel;
use crate::core::monitor_tree::{
    CheckResult, ContainerNode, Inventory, LeafNode, MonitorTree, Node, NodeFactory,
    ResourceDescriptor, ResourceKey, TreeOptions, Worker,
};
use crate::error::{FleetError, Result};

pub const ROOT_KEY: &str = "fleet";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: AlertLevel,
    #[serde(default)]
    pub detail: Option<String>,
    /// Make the check itself fail
    #[serde(default)]
    pub fail: bool,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl FleetSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let spec: FleetSpec = serde_json::from_slice(&data)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Ids must be unique among hosts and among the services of one host
    pub fn validate(&self) -> Result<()> {
        let mut hosts = HashSet::new();
        for host in &self.hosts {
            if !hosts.insert(host.id.as_str()) {
                return Err(FleetError::config(format!("Duplicate host id: {}", host.id)));
            }
            let mut services = HashSet::new();
            for service in &host.services {
                if !services.insert(service.id.as_str()) {
                    return Err(FleetError::config(format!(
                        "Duplicate service id {} on host {}",
                        service.id, host.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn root_resource(&self) -> ResourceDescriptor {
        ResourceDescriptor::named(ROOT_KEY, self.name.as_deref().unwrap_or("Fleet"))
    }
}

impl HostSpec {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            key: ResourceKey::new(&self.id),
            name: self.name.clone(),
        }
    }
}

impl ServiceSpec {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            key: ResourceKey::new(&self.id),
            name: self.name.clone(),
        }
    }
}

type DeclaredStatuses = Arc<RwLock<HashMap<(ResourceKey, ResourceKey), ServiceSpec>>>;

/// Live inventories backing a fleet tree
pub struct FleetInventory {
    hosts: Arc<Inventory>,
    services: RwLock<HashMap<ResourceKey, Arc<Inventory>>>,
    declared: DeclaredStatuses,
}

impl FleetInventory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hosts: Arc::new(Inventory::new()),
            services: RwLock::new(HashMap::new()),
            declared: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn hosts(&self) -> Arc<Inventory> {
        Arc::clone(&self.hosts)
    }

    /// Service inventory of `host`, created empty on first use
    pub fn services_of(&self, host: &ResourceKey) -> Arc<Inventory> {
        if let Some(inventory) = self.services.read().get(host) {
            return Arc::clone(inventory);
        }
        Arc::clone(
            self.services
                .write()
                .entry(host.clone())
                .or_insert_with(|| Arc::new(Inventory::new())),
        )
    }

    /// Bring the inventories in line with `spec`.
    ///
    /// Every inventory is updated even if one of them reports an error;
    /// the first error is returned.
    pub fn apply(&self, spec: &FleetSpec) -> Result<()> {
        let next: HashMap<(ResourceKey, ResourceKey), ServiceSpec> = spec
            .hosts
            .iter()
            .flat_map(|host| {
                host.services.iter().map(move |service| {
                    (
                        (ResourceKey::new(&host.id), ResourceKey::new(&service.id)),
                        service.clone(),
                    )
                })
            })
            .collect();

        // Retired services stay declared until their leaves are gone
        self.declared
            .write()
            .extend(next.iter().map(|(key, service)| (key.clone(), service.clone())));

        let mut outcome = Ok(());
        let mut keep = |result: Result<()>| {
            if let Err(e) = result {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        };

        // Services first, so new host containers start with a full list
        for host in &spec.hosts {
            let services = spec_services(host);
            keep(self.services_of(&ResourceKey::new(&host.id)).replace(services));
        }

        keep(self.hosts.replace(spec.hosts.iter().map(HostSpec::descriptor).collect()));

        let live: HashSet<ResourceKey> =
            spec.hosts.iter().map(|h| ResourceKey::new(&h.id)).collect();
        self.services.write().retain(|host, _| live.contains(host));
        self.declared.write().retain(|key, _| next.contains_key(key));

        outcome
    }

    pub fn factory(self: &Arc<Self>) -> Arc<dyn NodeFactory> {
        Arc::new(HostFactory {
            fleet: Arc::clone(self),
        })
    }

    /// Unstarted tree over this fleet
    pub fn tree(self: &Arc<Self>, root: ResourceDescriptor, options: TreeOptions) -> MonitorTree {
        MonitorTree::new(root, self.hosts(), self.factory(), options)
    }
}

fn spec_services(host: &HostSpec) -> Vec<ResourceDescriptor> {
    host.services.iter().map(ServiceSpec::descriptor).collect()
}

struct HostFactory {
    fleet: Arc<FleetInventory>,
}

impl NodeFactory for HostFactory {
    fn create(&self, parent: &Arc<ContainerNode>, resource: &ResourceDescriptor) -> Result<Node> {
        let services = self.fleet.services_of(&resource.key);
        let factory = Arc::new(ServiceFactory {
            host: resource.key.clone(),
            declared: Arc::clone(&self.fleet.declared),
        });
        Ok(ContainerNode::new(parent, resource.clone(), services, factory).into_node())
    }
}

struct ServiceFactory {
    host: ResourceKey,
    declared: DeclaredStatuses,
}

impl NodeFactory for ServiceFactory {
    fn create(&self, parent: &Arc<ContainerNode>, resource: &ResourceDescriptor) -> Result<Node> {
        let worker = Arc::new(DeclaredWorker {
            host: self.host.clone(),
            service: resource.key.clone(),
            declared: Arc::clone(&self.declared),
        });
        Ok(LeafNode::new(parent, resource.clone(), worker).into_node())
    }
}

/// Reports the status the inventory file declares for one service
pub struct DeclaredWorker {
    host: ResourceKey,
    service: ResourceKey,
    declared: DeclaredStatuses,
}

impl Worker for DeclaredWorker {
    fn check(&self) -> Result<CheckResult> {
        let declared = self.declared.read();
        let spec = declared
            .get(&(self.host.clone(), self.service.clone()))
            .ok_or_else(|| {
                FleetError::worker(format!(
                    "{} is no longer declared on {}",
                    self.service, self.host
                ))
            })?;

        if spec.fail {
            let reason = spec.detail.as_deref().unwrap_or("check failed");
            return Err(FleetError::worker(reason.to_string()));
        }

        Ok(CheckResult {
            level: spec.level,
            detail: spec.detail.clone(),
        })
    }

    fn interval(&self) -> Option<Duration> {
        self.declared
            .read()
            .get(&(self.host.clone(), self.service.clone()))
            .and_then(|spec| spec.interval_secs)
            .map(Duration::from_secs)
    }
}
