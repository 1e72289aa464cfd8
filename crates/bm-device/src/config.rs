/// Static properties of an emulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Name used for logging and thread names.
    pub name: String,
    /// Size of the device memory pool in bytes.
    pub memory_capacity: usize,
    /// Maximum number of workers in one group.
    pub max_threads_per_group: usize,
    /// Bytes of group-shared scratch memory available to one group.
    pub shared_memory_per_group: usize,
    /// Number of groups that may execute at the same time.
    pub multiprocessors: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            name: "bm-sim".to_string(),
            memory_capacity: 256 << 20,
            max_threads_per_group: 1024,
            shared_memory_per_group: 48 << 10,
            multiprocessors: cores.clamp(1, 8),
        }
    }
}

impl DeviceConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_memory_capacity(mut self, bytes: usize) -> Self {
        self.memory_capacity = bytes;
        self
    }

    pub fn with_max_threads_per_group(mut self, threads: usize) -> Self {
        self.max_threads_per_group = threads;
        self
    }

    pub fn with_shared_memory_per_group(mut self, bytes: usize) -> Self {
        self.shared_memory_per_group = bytes;
        self
    }

    pub fn with_multiprocessors(mut self, count: usize) -> Self {
        self.multiprocessors = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fits_a_16x16_tiled_group() {
        let cfg = DeviceConfig::default();
        assert!(cfg.max_threads_per_group >= 256);
        // two 16x16 f32 scratch tiles
        assert!(cfg.shared_memory_per_group >= 2 * 256 * 4);
        assert!(cfg.multiprocessors >= 1);
    }

    #[test]
    fn test_builders() {
        let cfg = DeviceConfig::default()
            .with_name("tiny")
            .with_memory_capacity(1024)
            .with_multiprocessors(2);
        assert_eq!(cfg.name, "tiny");
        assert_eq!(cfg.memory_capacity, 1024);
        assert_eq!(cfg.multiprocessors, 2);
    }
}
