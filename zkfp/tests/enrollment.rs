mod common;

use common::{library, template, TestZkfp};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use zkfp::{decode_template, split_template, CacheHandle, ErrorCode};

fn ready() -> (TestZkfp, CacheHandle) {
    let (mut zk, _) = library(1);
    zk.init().unwrap();
    zk.open_device(0).unwrap();
    let cache = zk.create_cache().unwrap();
    (zk, cache)
}

#[test]
fn test_representative_merge() {
    let (mut zk, cache) = ready();
    let mut out = vec![0u8; 2048];
    
    let len = zk
        .gen_reg_template(cache, &template(60, 1), &template(80, 1), &template(70, 1), &mut out)
        .unwrap();
    
    assert_eq!(&out[..len], template(80, 1).as_slice());
    assert_eq!(zk.last_quality(), 80);
}

#[test]
fn test_best_two_merge() {
    let (mut zk, cache) = ready();
    zk.set_cache_parameter(cache, 5005, 2).unwrap();
    let mut out = vec![0u8; 2048];
    
    let len = zk
        .gen_reg_template(cache, &template(60, 1), &template(80, 1), &template(70, 1), &mut out)
        .unwrap();
    
    let parts = split_template(&out[..len]).unwrap();
    assert_eq!(parts, vec![template(80, 1), template(70, 1)]);
    
    let plain = decode_template(&out[..len]).unwrap();
    assert_eq!(zkfp_core::Header::parse(&plain).unwrap().parts, 2);
}

#[test]
fn test_captures_must_match() {
    let (mut zk, cache) = ready();
    let mut out = vec![0u8; 2048];
    
    let err = zk
        .gen_reg_template(cache, &template(60, 1), &template(80, 1), &template(70, 2), &mut out)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Merge);
    assert!(matches!(
        err,
        zkfp::Error::Merge(ref inner) if matches!(**inner, zkfp::Error::Core(zkfp_core::Error::CapturesDiffer { .. }))
    ));
}

#[test]
fn test_missing_capture() {
    let (mut zk, cache) = ready();
    let mut out = vec![0u8; 2048];
    
    let err = zk
        .gen_reg_template(cache, &template(60, 1), &[], &template(70, 1), &mut out)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParam);
}

#[test]
fn test_output_too_small() {
    let (mut zk, cache) = ready();
    let mut out = vec![0u8; 20];
    
    let err = zk
        .gen_reg_template(cache, &template(60, 1), &template(80, 1), &template(70, 1), &mut out)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotEnough);
}

#[test]
fn test_cache_parameters() {
    let (mut zk, cache) = ready();
    
    assert_eq!(zk.set_cache_parameter(cache, 42, 1).unwrap_err().code(), ErrorCode::NotSupport);
    
    zk.set_cache_parameter(cache, 5005, 3).unwrap();
    assert_eq!(zk.session().unwrap().merge_mode(), zkfp::MergeMode::BestTwo);
    
    zk.set_cache_parameter(cache, 5005, 1).unwrap();
    assert_eq!(zk.session().unwrap().merge_mode(), zkfp::MergeMode::Representative);
}

#[test]
fn test_enroll_then_identify() {
    let (mut zk, cache) = ready();
    let mut out = vec![0u8; 2048];
    let len = zk
        .gen_reg_template(cache, &template(60, 9), &template(65, 9), &template(50, 9), &mut out)
        .unwrap();
    
    zk.add_template(cache, 7, &out[..len]).unwrap();
    assert_eq!(zk.identify(cache, &template(40, 9)).unwrap(), (7, 67));
}

proptest! {
    #[test]
    fn prop_representative_is_best_capture(q in proptest::array::uniform3(1u8..=100)) {
        let (mut zk, cache) = ready();
        let mut out = vec![0u8; 2048];
        let captures: Vec<_> = q.iter().map(|&quality| template(quality, 3)).collect();
        
        let len = zk
            .gen_reg_template(cache, &captures[0], &captures[1], &captures[2], &mut out)
            .unwrap();
        
        let best = (0..3).max_by_key(|&i| q[i]).unwrap();
        let parts = split_template(&out[..len]).unwrap();
        prop_assert_eq!(parts, vec![captures[best].clone()]);
        prop_assert_eq!(zk.last_quality(), q[best] as i32);
    }
}
