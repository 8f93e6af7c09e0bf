use std::collections::BTreeMap;

/// Which half of the registry an id lives in. Layer and alert ids never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Partition {
    Layers,
    Alerts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnEntry<H> {
    pub handle: H,
    /// Content fingerprint the drawable was built from.
    pub fingerprint: u32,
}

/// Live drawable handles keyed by layer or alert id. At most one entry per id.
#[derive(Debug)]
pub struct DrawnLayerRegistry<H> {
    layers: BTreeMap<String, DrawnEntry<H>>,
    alerts: BTreeMap<String, DrawnEntry<H>>,
}

impl<H> Default for DrawnLayerRegistry<H> {
    fn default() -> Self {
        Self {
            layers: BTreeMap::new(),
            alerts: BTreeMap::new(),
        }
    }
}

impl<H> DrawnLayerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, partition: Partition) -> &BTreeMap<String, DrawnEntry<H>> {
        match partition {
            Partition::Layers => &self.layers,
            Partition::Alerts => &self.alerts,
        }
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut BTreeMap<String, DrawnEntry<H>> {
        match partition {
            Partition::Layers => &mut self.layers,
            Partition::Alerts => &mut self.alerts,
        }
    }

    pub fn get(&self, partition: Partition, id: &str) -> Option<&DrawnEntry<H>> {
        self.partition(partition).get(id)
    }

    pub fn contains(&self, partition: Partition, id: &str) -> bool {
        self.partition(partition).contains_key(id)
    }

    pub fn ids(&self, partition: Partition) -> Vec<String> {
        self.partition(partition).keys().cloned().collect()
    }

    /// Remove and return the entry for `id`.
    pub fn take(&mut self, partition: Partition, id: &str) -> Option<DrawnEntry<H>> {
        self.partition_mut(partition).remove(id)
    }

    /// Register a freshly created drawable. Returns the displaced entry, which
    /// the caller must remove from the surface.
    pub fn register(
        &mut self,
        partition: Partition,
        id: &str,
        entry: DrawnEntry<H>,
    ) -> Option<DrawnEntry<H>> {
        self.partition_mut(partition).insert(id.to_string(), entry)
    }

    /// Empty both partitions, layers first.
    pub fn drain_all(&mut self) -> Vec<(Partition, String, DrawnEntry<H>)> {
        let layers = std::mem::take(&mut self.layers)
            .into_iter()
            .map(|(id, entry)| (Partition::Layers, id, entry));
        let alerts = std::mem::take(&mut self.alerts)
            .into_iter()
            .map(|(id, entry)| (Partition::Alerts, id, entry));
        layers.chain(alerts).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len() + self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
