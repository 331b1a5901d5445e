mod common;

use std::time::{Duration, Instant};

use common::{frame, library, FakeBus, FakeEngine, Frame};
use pretty_assertions::assert_eq;
use zkfp::{decode_template, CaptureParams, DeviceHandle, ErrorCode, InitStatus, SessionState, Zkfp};
use zkfp_core::VendorRequest;

#[test]
fn test_init_without_sensors() {
    let (mut zk, _) = library(0);
    
    let err = zk.init().unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoDevice);
    assert!(!zk.is_initialized());
    assert_eq!(zk.device_count().unwrap_err().code(), ErrorCode::Init);
}

#[test]
fn test_init_twice() {
    let (mut zk, _) = library(2);
    
    assert_eq!(zk.init().unwrap(), InitStatus::Initialized);
    assert_eq!(zk.init().unwrap(), InitStatus::AlreadyInitialized);
    assert_eq!(zk.device_count().unwrap(), 2);
}

#[test]
fn test_open_requires_init() {
    let (mut zk, _) = library(1);
    assert_eq!(zk.open_device(0).unwrap_err().code(), ErrorCode::Init);
    
    zk.init().unwrap();
    assert_eq!(zk.open_device(1).unwrap_err().code(), ErrorCode::NoDevice);
}

#[test]
fn test_open_sequence_and_params() {
    let (mut zk, sensors) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    assert_eq!(
        sensors[0].requests(),
        vec![
            (VendorRequest::Init, 0, 0),
            (VendorRequest::GetGpio, 0, 0x55),
            (VendorRequest::SetGpio, 32769, 6),
            (VendorRequest::SetGpio, 32769, 7),
        ]
    );
    assert_eq!(
        zk.capture_params(device).unwrap(),
        CaptureParams { width: 300, height: 400, dpi: 500 }
    );
    assert_eq!(zk.device_info(device).unwrap().product_id, 0x0120);
    assert_eq!(zk.current_device(), Some(device));
}

#[test]
fn test_session_start_configures_engine() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    zk.open_device(0).unwrap();
    
    assert_eq!(
        zk.engine().params,
        vec![(8, -1), (4, 180), (6, 4), (5, 0), (1, 85), (10, 1664), (8, -1), (16, 21), (1, 140)]
    );
    let session = zk.session().unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.workspace_len(), 300 * 400 + 111_040);
}

#[test]
fn test_session_is_shared_between_devices() {
    let (mut zk, _) = library(2);
    zk.init().unwrap();
    zk.open_device(0).unwrap();
    let configured = zk.engine().params.len();
    
    let second = zk.open_device(1).unwrap();
    assert_eq!(zk.engine().params.len(), configured);
    assert_eq!(zk.current_device(), Some(second));
}

#[test]
fn test_unlicensed_engine_uses_challenge() {
    let engine = FakeEngine::unlicensed();
    let mut zk = Zkfp::with_bus(FakeBus::with_sensors(1), engine, common::fast_config());
    zk.init().unwrap();
    
    zk.open_device(0).unwrap();
    assert!(zk.engine().license_loaded);
}

#[test]
fn test_unlicensed_engine_without_challenge() {
    let engine = FakeEngine::unlicensed();
    let mut zk = Zkfp::with_bus(FakeBus::with_sensors(1), engine, common::fast_config()).with_challenge(None);
    zk.init().unwrap();
    
    assert_eq!(zk.open_device(0).unwrap_err().code(), ErrorCode::InitLib);
    assert!(zk.session().is_none());
}

fn echo(probe: u32) -> u32 {
    probe
}

#[test]
fn test_unlicensed_engine_wrong_answer() {
    let engine = FakeEngine::unlicensed();
    let mut zk = Zkfp::with_bus(FakeBus::with_sensors(1), engine, common::fast_config())
        .with_challenge(Some(echo as zkfp::Challenge));
    zk.init().unwrap();
    
    assert_eq!(zk.open_device(0).unwrap_err().code(), ErrorCode::InitLib);
    assert!(!zk.engine().license_loaded);
}

#[test]
fn test_invalid_handles() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    let (_, id) = device.into_raw();
    
    let forged = DeviceHandle::from_raw(0xDEAD_BEEF, id);
    assert_eq!(zk.close_device(forged).unwrap_err().code(), ErrorCode::InvalidHandle);
    
    zk.close_device(device).unwrap();
    assert_eq!(zk.capture_params(device).unwrap_err().code(), ErrorCode::InvalidHandle);
    assert_eq!(zk.close_device(device).unwrap_err().code(), ErrorCode::InvalidHandle);
    assert_eq!(zk.current_device(), None);
}

#[test]
fn test_terminate() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    zk.terminate();
    assert!(zk.engine().terminated);
    assert!(zk.session().is_none());
    assert_eq!(zk.capture_params(device).unwrap_err().code(), ErrorCode::Init);
    
    assert_eq!(zk.init().unwrap(), InitStatus::Initialized);
}

#[test]
fn test_set_parameter_refreshes_cache() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    zk.set_parameter(device, 3, 1000).unwrap();
    assert_eq!(zk.capture_params(device).unwrap().dpi, 1000);
    assert_eq!(zk.get_parameter(device, 3).unwrap(), 1000);
    
    assert_eq!(zk.set_parameter(device, 42, 1).unwrap_err().code(), ErrorCode::NotSupport);
    assert_eq!(zk.get_parameter(device, 42).unwrap_err().code(), ErrorCode::NotSupport);
}

#[test]
fn test_extended_flag() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    zk.set_parameter_bytes(device, 10001, &1u32.to_le_bytes()).unwrap();
    assert_eq!(zk.get_parameter(device, 10001).unwrap(), 1);
    assert_eq!(zk.engine().param(5010), Some(1));
    
    zk.set_parameter(device, 10001, 7).unwrap();
    assert_eq!(zk.get_parameter(device, 10001).unwrap(), 0);
    assert_eq!(zk.engine().param(5010), Some(0));
    
    let err = zk.set_parameter_bytes(device, 10001, &[1, 0, 0]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParam);
}

#[test]
fn test_acquire_image_small_buffer() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    let mut image = vec![0u8; 300 * 400 - 1];
    assert_eq!(
        zk.acquire_image(device, &mut image).unwrap_err().code(),
        ErrorCode::InvalidParam
    );
}

#[test]
fn test_acquire_image_retries_until_frame() {
    let (mut zk, sensors) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    sensors[0].push_frame(Frame::Timeout);
    sensors[0].push_frame(Frame::Timeout);
    sensors[0].push_frame(frame(0x42));
    
    let mut image = vec![0xAAu8; 300 * 400];
    zk.acquire_image(device, &mut image).unwrap();
    assert!(image.iter().all(|&p| p == 0x42));
    
    let triggers = sensors[0]
        .requests()
        .iter()
        .filter(|(r, _, _)| *r == VendorRequest::TriggerImage)
        .count();
    assert_eq!(triggers, 3);
}

#[test]
fn test_acquire_image_times_out() {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    
    let mut image = vec![0u8; 300 * 400];
    let started = Instant::now();
    let err = zk.acquire_image(device, &mut image).unwrap_err();
    
    assert_eq!(err.code(), ErrorCode::Capture);
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_acquire_image_hard_error() {
    let (mut zk, sensors) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    sensors[0].push_frame(Frame::Broken);
    
    let mut image = vec![0u8; 300 * 400];
    let err = zk.acquire_image(device, &mut image).unwrap_err();
    assert!(matches!(err, zkfp::Error::Capture(_)));
}

#[test]
fn test_detect_mode_capture() {
    let (mut zk, sensors) = library(1);
    {
        let mut state = sensors[0].state.lock().unwrap();
        state.probe = [5, 0];
        state.detect_status = 1;
    }
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    sensors[0].push_frame(frame(0x10));
    
    let mut image = vec![0u8; 300 * 400];
    zk.acquire_image(device, &mut image).unwrap();
    
    let requests = sensors[0].requests();
    assert!(requests.iter().any(|(r, _, _)| *r == VendorRequest::DetectImage));
    assert!(!requests.iter().any(|(r, _, _)| *r == VendorRequest::TriggerImage));
}

#[test]
fn test_acquire_fingerprint() {
    let (mut zk, sensors) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    sensors[0].push_frame(frame(0x42));
    
    let mut image = vec![0u8; 300 * 400];
    let mut template = vec![0u8; 2048];
    let len = zk.acquire_fingerprint(device, &mut image, &mut template).unwrap();
    
    assert_eq!(&template[..len], common::template(70, 0x42).as_slice());
    assert_eq!(decode_template(&template[..len]).unwrap(), common::plain_template(70, 0x42));
    assert_eq!(zk.last_quality(), 70);
}

#[test]
fn test_acquire_fingerprint_small_output() {
    let (mut zk, sensors) = library(1);
    zk.init().unwrap();
    let device = zk.open_device(0).unwrap();
    sensors[0].push_frame(frame(0x42));
    
    let mut image = vec![0u8; 300 * 400];
    let mut template = vec![0u8; 16];
    let err = zk.acquire_fingerprint(device, &mut image, &mut template).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotEnough);
}
