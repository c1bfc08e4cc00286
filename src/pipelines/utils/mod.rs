use crate::core::ModelOptions;
use candle_core::Device;

/// Loads a device to be used for the model.
/// If `index` is `Some(i)` it will attempt to load the specified CUDA device.
/// When `None` it uses CUDA device 0 if available and otherwise falls back
/// to CPU.
pub fn load_device_with(index: Option<usize>) -> anyhow::Result<Device> {
    match index {
        Some(i) => Ok(Device::new_cuda(i)?),
        None => Ok(Device::cuda_if_available(0)?),
    }
}

/// Request for a specific device, used by pipeline builders.
#[derive(Clone, Debug, Default)]
pub enum DeviceRequest {
    /// Use CUDA if available, otherwise CPU (default behavior).
    #[default]
    Default,
    /// Force CPU even if CUDA is available.
    Cpu,
    /// Select a specific CUDA device by index.
    Cuda(usize),
    /// Provide an already constructed device.
    Explicit(Device),
}

impl DeviceRequest {
    /// Resolve the request into an actual [`Device`].
    pub fn resolve(self) -> anyhow::Result<Device> {
        match self {
            DeviceRequest::Default => load_device_with(None),
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => load_device_with(Some(i)),
            DeviceRequest::Explicit(d) => Ok(d),
        }
    }
}

/// Trait providing convenience methods for pipeline builders to select a device.
pub trait DeviceSelectable: Sized {
    /// Returns a mutable reference to the builder's internal [`DeviceRequest`].
    fn device_request_mut(&mut self) -> &mut DeviceRequest;

    /// Force the pipeline to run on CPU.
    fn cpu(mut self) -> Self {
        *self.device_request_mut() = DeviceRequest::Cpu;
        self
    }

    /// Select a specific CUDA device by index.
    fn cuda_device(mut self, index: usize) -> Self {
        *self.device_request_mut() = DeviceRequest::Cuda(index);
        self
    }

    /// Provide an explicit [`Device`].
    fn device(mut self, device: Device) -> Self {
        *self.device_request_mut() = DeviceRequest::Explicit(device);
        self
    }

    /// Replace the whole request, e.g. one parsed from configuration.
    fn device_request(mut self, request: DeviceRequest) -> Self {
        *self.device_request_mut() = request;
        self
    }
}

/// Utility to generate a cache key combining model options and device location.
pub fn build_cache_key<O: ModelOptions>(options: &O, device: &Device) -> String {
    format!("{}-{:?}", options.cache_key(), device.location())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Options(&'static str);

    impl ModelOptions for Options {
        fn cache_key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_cpu_request_resolves_to_cpu() {
        let device = DeviceRequest::Cpu.resolve().unwrap();
        assert!(device.is_cpu());
    }

    #[test]
    fn test_cache_key_includes_device() {
        let key = build_cache_key(&Options("model-a"), &Device::Cpu);
        assert!(key.starts_with("model-a-"));
        assert!(key.contains("Cpu"));
        assert_ne!(key, build_cache_key(&Options("model-b"), &Device::Cpu));
    }
}
