// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for camera sharing and the permission gate

use camera_broker::backends::hardware::{ProviderStats, SimulatedProvider, StaticRegistry};
use camera_broker::broker::{CallerIdentity, Enumerator, UidAllowList};
use camera_broker::constants::AID_AUTOMOTIVE_EVS;
use camera_broker::BrokerError;
use std::sync::{Arc, Barrier};
use std::thread;

const CLIENT_A: CallerIdentity = CallerIdentity {
    pid: 1001,
    uid: AID_AUTOMOTIVE_EVS,
};
const CLIENT_B: CallerIdentity = CallerIdentity {
    pid: 1002,
    uid: AID_AUTOMOTIVE_EVS,
};
const INTRUDER: CallerIdentity = CallerIdentity { pid: 666, uid: 0 };

fn setup() -> (Arc<Enumerator>, Arc<SimulatedProvider>) {
    let provider = Arc::new(SimulatedProvider::new(["cam0", "cam1"]));
    let registry = Arc::new(StaticRegistry::new().with("hw", provider.clone()));
    let enumerator = Arc::new(Enumerator::new(
        registry,
        UidAllowList::new([AID_AUTOMOTIVE_EVS]),
    ));
    enumerator.init("hw").unwrap();
    (enumerator, provider)
}

#[test]
fn test_camera_list_passes_through() {
    let (enumerator, _provider) = setup();
    let ids: Vec<String> = enumerator
        .get_camera_list(&CLIENT_A)
        .unwrap()
        .into_iter()
        .map(|desc| desc.camera_id)
        .collect();
    assert_eq!(ids, vec!["cam0", "cam1"]);
}

#[test]
fn test_two_clients_share_one_camera() {
    // A opens, B opens, A closes, B closes
    let (enumerator, provider) = setup();

    let a = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();
    let status = enumerator.snapshot(&CLIENT_A).unwrap();
    assert_eq!(status.camera("cam0").unwrap().clients, 1);

    let b = enumerator.open_camera(&CLIENT_B, "cam0").unwrap();
    let status = enumerator.snapshot(&CLIENT_A).unwrap();
    assert_eq!(status.open_cameras.len(), 1);
    assert_eq!(status.camera("cam0").unwrap().clients, 2);
    assert_eq!(provider.stats().camera_opens, 1);
    assert!(Arc::ptr_eq(&a.parent().unwrap(), &b.parent().unwrap()));

    enumerator.close_camera(&CLIENT_A, Some(&a)).unwrap();
    let status = enumerator.snapshot(&CLIENT_A).unwrap();
    assert_eq!(status.camera("cam0").unwrap().clients, 1);
    assert_eq!(provider.stats().camera_closes, 0);
    assert!(provider.is_in_use("cam0"));
    assert_eq!(b.get_info().unwrap().camera_id, "cam0");

    enumerator.close_camera(&CLIENT_B, Some(&b)).unwrap();
    let status = enumerator.snapshot(&CLIENT_A).unwrap();
    assert!(status.open_cameras.is_empty());
    assert_eq!(provider.stats().camera_closes, 1);
    assert!(!provider.is_in_use("cam0"));
}

#[test]
fn test_concurrent_opens_create_one_wrapper() {
    let (enumerator, provider) = setup();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [CLIENT_A, CLIENT_B]
        .into_iter()
        .map(|caller| {
            let enumerator = Arc::clone(&enumerator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                enumerator.open_camera(&caller, "cam0")
            })
        })
        .collect();

    let proxies: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert_eq!(provider.stats().camera_opens, 1);
    assert_ne!(proxies[0].id(), proxies[1].id());
    assert!(Arc::ptr_eq(
        &proxies[0].parent().unwrap(),
        &proxies[1].parent().unwrap()
    ));
    assert_eq!(proxies[0].parent().unwrap().client_count(), 2);
}

#[test]
fn test_close_of_non_last_client_keeps_hardware() {
    let (enumerator, provider) = setup();
    let proxies: Vec<_> = (0..3)
        .map(|_| enumerator.open_camera(&CLIENT_A, "cam1").unwrap())
        .collect();

    for proxy in &proxies[..2] {
        enumerator.close_camera(&CLIENT_A, Some(proxy)).unwrap();
        assert_eq!(provider.stats().camera_closes, 0);
    }

    enumerator.close_camera(&CLIENT_A, Some(&proxies[2])).unwrap();
    assert_eq!(provider.stats().camera_closes, 1);
}

#[test]
fn test_close_twice_is_a_no_op() {
    let (enumerator, provider) = setup();
    let proxy = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();

    assert_eq!(enumerator.close_camera(&CLIENT_A, Some(&proxy)), Ok(()));
    assert_eq!(
        enumerator.close_camera(&CLIENT_A, Some(&proxy)),
        Err(BrokerError::NotFound)
    );
    assert_eq!(provider.stats().camera_closes, 1);
    assert!(!proxy.is_attached());
}

#[test]
fn test_close_of_empty_handle_is_a_no_op() {
    let (enumerator, provider) = setup();
    let _proxy = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();

    assert_eq!(
        enumerator.close_camera(&CLIENT_A, None),
        Err(BrokerError::NotFound)
    );
    assert_eq!(provider.stats().camera_closes, 0);
    assert_eq!(enumerator.snapshot(&CLIENT_A).unwrap().total_clients(), 1);
}

#[test]
fn test_closed_proxy_reports_service_gone() {
    let (enumerator, _provider) = setup();
    let a = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();
    let b = enumerator.open_camera(&CLIENT_B, "cam0").unwrap();

    enumerator.close_camera(&CLIENT_A, Some(&a)).unwrap();

    assert!(a.get_info().is_err());
    assert!(!a.start_video_stream().is_ok());
    // The other client is unaffected
    assert!(b.start_video_stream().is_ok());
}

#[test]
fn test_unknown_camera_creates_no_wrapper() {
    let (enumerator, provider) = setup();

    assert_eq!(
        enumerator.open_camera(&CLIENT_A, "cam9").unwrap_err(),
        BrokerError::DeviceUnavailable("cam9".to_string())
    );
    assert!(enumerator.snapshot(&CLIENT_A).unwrap().open_cameras.is_empty());
    assert_eq!(provider.stats().camera_closes, 0);
}

#[test]
fn test_camera_can_be_reopened_after_release() {
    let (enumerator, provider) = setup();

    let first = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();
    enumerator.close_camera(&CLIENT_A, Some(&first)).unwrap();
    let second = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();

    assert_eq!(provider.stats().camera_opens, 2);
    assert!(second.get_info().is_ok());
    assert!(first.get_info().is_err());
}

#[test]
fn test_stream_stops_when_last_streaming_client_closes() {
    let (enumerator, _provider) = setup();
    let a = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();
    let b = enumerator.open_camera(&CLIENT_B, "cam0").unwrap();

    assert!(a.start_video_stream().is_ok());
    assert!(b.start_video_stream().is_ok());
    assert_eq!(
        enumerator.snapshot(&CLIENT_A).unwrap().camera("cam0").unwrap().streaming_clients,
        2
    );

    enumerator.close_camera(&CLIENT_A, Some(&a)).unwrap();
    assert_eq!(
        enumerator.snapshot(&CLIENT_A).unwrap().camera("cam0").unwrap().streaming_clients,
        1
    );
}

#[test]
fn test_unauthorized_caller_changes_nothing() {
    let (enumerator, provider) = setup();
    let proxy = enumerator.open_camera(&CLIENT_A, "cam0").unwrap();
    let display = enumerator.open_display(&CLIENT_A).unwrap();
    let before_stats: ProviderStats = provider.stats();
    let denied = BrokerError::PermissionDenied { uid: INTRUDER.uid };

    assert_eq!(enumerator.get_camera_list(&INTRUDER).unwrap_err(), denied);
    assert_eq!(enumerator.open_camera(&INTRUDER, "cam1").unwrap_err(), denied);
    assert_eq!(enumerator.open_camera(&INTRUDER, "cam0").unwrap_err(), denied);
    assert_eq!(enumerator.close_camera(&INTRUDER, Some(&proxy)), Err(denied.clone()));
    assert_eq!(enumerator.open_display(&INTRUDER).unwrap_err(), denied);
    assert_eq!(enumerator.close_display(&INTRUDER, Some(&display)), Err(denied.clone()));
    assert_eq!(enumerator.snapshot(&INTRUDER).unwrap_err(), denied);
    assert_eq!(
        enumerator.get_display_state(&INTRUDER),
        camera_broker::backends::hardware::DisplayState::Dead
    );

    assert_eq!(provider.stats(), before_stats);
    assert!(proxy.is_attached());
    assert!(display.is_alive());
    let status = enumerator.snapshot(&CLIENT_A).unwrap();
    assert_eq!(status.total_clients(), 1);
    assert_ne!(
        status.display,
        camera_broker::backends::hardware::DisplayState::NotOpen
    );
}

#[test]
fn test_open_close_churn_leaves_nothing_open() {
    let (enumerator, provider) = setup();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let enumerator = Arc::clone(&enumerator);
            let barrier = Arc::clone(&barrier);
            let caller = CallerIdentity::new(2000 + i as u32, AID_AUTOMOTIVE_EVS);
            let camera_id = if i % 2 == 0 { "cam0" } else { "cam1" };
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    let proxy = enumerator.open_camera(&caller, camera_id).unwrap();
                    enumerator.close_camera(&caller, Some(&proxy)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = provider.stats();
    assert_eq!(stats.camera_opens, stats.camera_closes);
    assert!(!provider.is_in_use("cam0"));
    assert!(!provider.is_in_use("cam1"));
    assert!(enumerator.snapshot(&CLIENT_A).unwrap().open_cameras.is_empty());
}
