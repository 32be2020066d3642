use candle_core::{DType, Device, Tensor};
use ragstore_core::config::DeviceKind;
use ragstore_embed::{cls_l2, masked_mean_l2, select_device};

fn hidden(dev: &Device) -> Tensor {
    // Two tokens with hidden dim 4.
    Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0,
                         5.0, 6.0, 7.0, 8.0],
                       (1, 2, 4), dev).unwrap()
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    for (a, b) in actual.iter().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn masked_mean_l2_skips_masked_tokens() {
    let dev = Device::Cpu;
    let mask = Tensor::from_slice(&[1i64, 0i64], (1, 2), &dev).unwrap().to_dtype(DType::F32).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&hidden(&dev), &mask).unwrap().to_vec2().unwrap();
    let n = 30f32.sqrt();
    assert_close(&out[0], &[1.0 / n, 2.0 / n, 3.0 / n, 4.0 / n]);
}

#[test]
fn masked_mean_l2_averages_all_unmasked_tokens() {
    let dev = Device::Cpu;
    let mask = Tensor::from_slice(&[1u32, 1u32], (1, 2), &dev).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&hidden(&dev), &mask).unwrap().to_vec2().unwrap();
    // mean = [3,4,5,6]
    let n = (9f32 + 16.0 + 25.0 + 36.0).sqrt();
    assert_close(&out[0], &[3.0 / n, 4.0 / n, 5.0 / n, 6.0 / n]);
}

#[test]
fn cls_pooling_takes_first_token() {
    let dev = Device::Cpu;
    let out: Vec<Vec<f32>> = cls_l2(&hidden(&dev)).unwrap().to_vec2().unwrap();
    let n = 30f32.sqrt();
    assert_eq!(out.len(), 1);
    assert_close(&out[0], &[1.0 / n, 2.0 / n, 3.0 / n, 4.0 / n]);
}

#[test]
fn pooling_rejects_wrong_rank() {
    let dev = Device::Cpu;
    let flat = Tensor::from_slice(&[1.0f32, 2.0], (1, 2), &dev).unwrap();
    assert!(cls_l2(&flat).is_err());
}

#[test]
fn cpu_device_is_always_available() {
    assert!(matches!(select_device(DeviceKind::Cpu), Device::Cpu));
}
