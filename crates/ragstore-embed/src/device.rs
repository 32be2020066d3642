use candle_core::Device;
use ragstore_core::config::DeviceKind;

/// Resolve the configured device, falling back to CPU when the backend is not
/// compiled in or fails to initialise.
pub fn select_device(kind: DeviceKind) -> Device {
    match kind {
        DeviceKind::Cpu => {}
        DeviceKind::Metal => {
            #[cfg(feature = "metal")]
            {
                match Device::new_metal(0) {
                    Ok(dev) => { tracing::info!("device: metal"); return dev; }
                    Err(e) => tracing::warn!(error = %e, "metal unavailable"),
                }
            }
            #[cfg(not(feature = "metal"))]
            tracing::warn!("built without the `metal` feature");
        }
        DeviceKind::Cuda => {
            #[cfg(feature = "cuda")]
            {
                match Device::new_cuda(0) {
                    Ok(dev) => { tracing::info!("device: cuda"); return dev; }
                    Err(e) => tracing::warn!(error = %e, "cuda unavailable"),
                }
            }
            #[cfg(not(feature = "cuda"))]
            tracing::warn!("built without the `cuda` feature");
        }
    }
    tracing::info!("device: cpu");
    Device::Cpu
}
