// tests/controller.rs

use navbartemp_rs::core::config::{Config, PathsConfig, SamplingSettings};
use navbartemp_rs::core::controller::Controller;
use navbartemp_rs::core::notifier::ChannelSink;
use navbartemp_rs::core::temp::SourceKind;
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;

type Rx = UnboundedReceiver<(String, Value)>;

fn drain(rx: &mut Rx) -> Vec<Value> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|(id, payload)| {
            assert_eq!(id, "navbartemp");
            payload
        })
        .collect()
}

fn debug_settings() -> SamplingSettings {
    SamplingSettings {
        debug: true,
        ..SamplingSettings::default()
    }
}

fn controller(settings: SamplingSettings, paths: PathsConfig) -> (Controller, Rx) {
    let (sink, rx) = ChannelSink::channel();
    let config = Config {
        sampling: settings,
        paths,
        ..Config::default()
    };
    (Controller::from_config(&config, Arc::new(sink)), rx)
}

// A fake board: cpuinfo, thermal zone file, and no vendor tool
fn fake_board(td: &TempDir, hardware: &str, millidegrees: Option<&str>) -> PathsConfig {
    let paths = PathsConfig {
        cpuinfo: td.path().join("cpuinfo"),
        thermal_zone: td.path().join("temp"),
        vendor_tool: td.path().join("vcgencmd"),
        ..PathsConfig::default()
    };
    fs::write(&paths.cpuinfo, format!("processor\t: 0\nHardware\t: {hardware}\n")).unwrap();
    if let Some(raw) = millidegrees {
        fs::write(&paths.thermal_zone, raw).unwrap();
    }
    paths
}

#[tokio::test(start_paused = true)]
async fn debug_mode_publishes_every_five_seconds() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_startup().await;

    sleep(Duration::from_millis(12_500)).await;
    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 3);
    for m in &msgs {
        assert_eq!(m["israspi"], true);
        assert_eq!(m["issoc"], false);
        let t: f64 = m["raspitemp"].as_str().unwrap().parse().unwrap();
        assert!((5.0..60.0).contains(&t));
    }

    let status = ctl.status().await;
    assert!(status.supported);
    assert!(status.running);
    assert_eq!(status.source, Some(SourceKind::Synthetic));
    assert_eq!(status.sampling.unwrap().interval, Duration::from_secs(5));
    ctl.shutdown().await;
    assert!(!ctl.status().await.running);
}

#[tokio::test(start_paused = true)]
async fn disabling_publishes_one_empty_message_and_stops() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_startup().await;
    sleep(Duration::from_secs(1)).await;

    let off = SamplingSettings {
        enabled: false,
        ..debug_settings()
    };
    ctl.on_settings_changed(off.clone()).await.unwrap();
    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].get("raspitemp").is_some());
    assert_eq!(msgs[1], json!({}));

    // no ticks while disabled, and disabling again is a no-op
    sleep(Duration::from_secs(60)).await;
    ctl.on_settings_changed(off).await.unwrap();
    assert!(drain(&mut rx).is_empty());
    assert!(!ctl.status().await.running);

    ctl.on_settings_changed(debug_settings()).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].get("raspitemp").is_some());
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interval_change_restarts_without_overlap() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_startup().await;
    sleep(Duration::from_millis(500)).await;
    assert_eq!(drain(&mut rx).len(), 1);

    let faster = SamplingSettings {
        interval_secs: Some(1),
        ..debug_settings()
    };
    ctl.on_settings_changed(faster.clone()).await.unwrap();
    // ticks at 1s, 2s, 3s
    sleep(Duration::from_millis(3_100)).await;
    assert_eq!(drain(&mut rx).len(), 3);

    // same settings again: nothing restarts, cadence unchanged
    ctl.on_settings_changed(faster).await.unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(drain(&mut rx).len(), 2);
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_host_stays_idle() {
    let td = TempDir::new().unwrap();
    let paths = fake_board(&td, "Foo123", Some("42000"));
    let (ctl, mut rx) = controller(SamplingSettings::default(), paths);
    ctl.on_startup().await;

    let status = ctl.status().await;
    assert!(!status.supported);
    assert!(!status.running);
    assert_eq!(status.source, None);
    assert_eq!(status.sampling, None);

    ctl.on_settings_changed(SamplingSettings {
        interval_secs: Some(1),
        ..SamplingSettings::default()
    })
    .await
    .unwrap();
    sleep(Duration::from_secs(120)).await;
    assert!(drain(&mut rx).is_empty());
    assert!(!ctl.status().await.running);
}

#[cfg(target_os = "linux")]
#[tokio::test(start_paused = true)]
async fn soc_board_reads_thermal_zone() {
    let td = TempDir::new().unwrap();
    let paths = fake_board(&td, "sun50iw1p1", Some("47300\n"));
    let (ctl, mut rx) = controller(SamplingSettings::default(), paths);
    ctl.on_startup().await;

    sleep(Duration::from_secs(61)).await;
    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 3);
    assert_eq!(
        msgs[0],
        json!({ "israspi": false, "issoc": true, "raspitemp": "47.3" })
    );

    let status = ctl.status().await;
    assert_eq!(status.source, Some(SourceKind::ThermalZone));
    assert_eq!(status.sampling.unwrap().interval, Duration::from_secs(30));
    assert!(status.classification.unwrap().is_soc());
    ctl.shutdown().await;
}

#[cfg(target_os = "linux")]
#[tokio::test(start_paused = true)]
async fn broken_source_is_given_up_on() {
    let td = TempDir::new().unwrap();
    let paths = fake_board(&td, "sun50iw1p1", Some("40000"));
    let thermal = paths.thermal_zone.clone();
    let (ctl, mut rx) = controller(SamplingSettings::default(), paths);
    ctl.on_startup().await;
    sleep(Duration::from_secs(1)).await;

    fs::remove_file(&thermal).unwrap();
    sleep(Duration::from_secs(100)).await;

    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 4);
    assert!(msgs[0].get("raspitemp").is_some());
    assert!(msgs[1..].iter().all(|m| m.get("raspitemp").is_none()));

    let status = ctl.status().await;
    assert!(!status.supported);
    assert!(!status.running);

    // toggling does not bring a known-broken source back
    let off = SamplingSettings {
        enabled: false,
        ..SamplingSettings::default()
    };
    ctl.on_settings_changed(off).await.unwrap();
    ctl.on_settings_changed(SamplingSettings::default()).await.unwrap();
    sleep(Duration::from_secs(100)).await;
    assert_eq!(drain(&mut rx), vec![json!({})]);
    assert!(!ctl.status().await.running);
}

#[tokio::test(start_paused = true)]
async fn settings_before_startup_apply_at_startup() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_settings_changed(SamplingSettings {
        enabled: false,
        ..debug_settings()
    })
    .await
    .unwrap();
    ctl.on_startup().await;

    sleep(Duration::from_secs(30)).await;
    assert!(drain(&mut rx).is_empty());
    let status = ctl.status().await;
    assert!(status.supported);
    assert!(!status.running);
    assert!(!status.sampling.unwrap().enabled);
}

#[tokio::test(start_paused = true)]
async fn second_startup_is_ignored() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_startup().await;
    ctl.on_startup().await;

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(drain(&mut rx).len(), 3);
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_interval_is_rejected() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_startup().await;

    let bad = SamplingSettings {
        interval_secs: Some(0),
        ..debug_settings()
    };
    assert!(ctl.on_settings_changed(bad).await.is_err());
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(drain(&mut rx).len(), 3);
    assert_eq!(
        ctl.status().await.sampling.unwrap().interval,
        Duration::from_secs(5)
    );
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_updates_leave_one_timer() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    let ctl = Arc::new(ctl);
    ctl.on_startup().await;

    let updates: Vec<_> = (1..=4)
        .map(|secs| {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move {
                ctl.on_settings_changed(SamplingSettings {
                    interval_secs: Some(secs * 2),
                    ..debug_settings()
                })
                .await
            })
        })
        .collect();
    for u in updates {
        u.await.unwrap().unwrap();
    }
    drain(&mut rx);

    let interval = ctl.status().await.sampling.unwrap().interval;
    sleep(interval * 4 + interval / 2).await;
    let ticks = drain(&mut rx).len();
    assert!((4..=5).contains(&ticks), "{ticks} ticks for {interval:?}");
    ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn oversized_interval_is_rejected_after_a_tick() {
    let (ctl, mut rx) = controller(debug_settings(), PathsConfig::default());
    ctl.on_startup().await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(drain(&mut rx).len(), 1);

    for secs in [u64::MAX, 86_401] {
        let huge = SamplingSettings {
            interval_secs: Some(secs),
            ..debug_settings()
        };
        assert!(ctl.on_settings_changed(huge).await.is_err());
    }

    // still ticking on the old cadence
    sleep(Duration::from_secs(5)).await;
    assert_eq!(drain(&mut rx).len(), 1);
    assert!(ctl.status().await.running);

    let daily = SamplingSettings {
        interval_secs: Some(86_400),
        immediate_first_tick: false,
        ..debug_settings()
    };
    ctl.on_settings_changed(daily).await.unwrap();
    sleep(Duration::from_secs(60)).await;
    assert!(drain(&mut rx).is_empty());
    assert!(ctl.status().await.running);
    ctl.shutdown().await;
}
