use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use framecast::client::FrameSubscriber;
use framecast::{Broadcaster, Frame, ServerConfig};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn broadcaster(hwm: usize) -> Broadcaster {
    init_tracing();
    Broadcaster::new(ServerConfig::with_endpoint("tcp://127.0.0.1:0").high_water_mark(hwm))
        .unwrap()
}

async fn wait_for_subscribers(broadcaster: &Broadcaster, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while broadcaster.subscriber_count() != n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {n} subscribers, have {}",
            broadcaster.subscriber_count()
        )
    });
}

async fn next(subscriber: &mut FrameSubscriber) -> Frame {
    tokio::time::timeout(Duration::from_secs(5), subscriber.next_frame())
        .await
        .expect("timed out waiting for frame")
        .unwrap()
        .expect("connection closed")
}

#[tokio::test]
async fn publish_without_subscribers_is_dropped() {
    let broadcaster = broadcaster(8);

    assert_eq!(broadcaster.publish("m1", "p1").unwrap(), 0);

    let mut subscriber = FrameSubscriber::connect(broadcaster.local_addr().unwrap())
        .await
        .unwrap();
    wait_for_subscribers(&broadcaster, 1).await;

    assert_eq!(broadcaster.publish("m2", "p2").unwrap(), 1);
    assert_eq!(next(&mut subscriber).await, Frame::new("m2", "p2"));
}

#[tokio::test]
async fn late_subscriber_gets_no_replay() {
    let broadcaster = broadcaster(8);
    let addr = broadcaster.start().unwrap();

    let mut early = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 1).await;
    broadcaster.publish("m1", "").unwrap();

    let mut late = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 2).await;
    broadcaster.publish("m2", "").unwrap();
    broadcaster.publish("m3", "").unwrap();

    assert_eq!(next(&mut early).await.metadata(), &Bytes::from_static(b"m1"));
    assert_eq!(next(&mut early).await.metadata(), &Bytes::from_static(b"m2"));
    assert_eq!(next(&mut early).await.metadata(), &Bytes::from_static(b"m3"));

    assert_eq!(next(&mut late).await.metadata(), &Bytes::from_static(b"m2"));
    assert_eq!(next(&mut late).await.metadata(), &Bytes::from_static(b"m3"));
}

#[tokio::test]
async fn closed_subscriber_does_not_affect_others() {
    let broadcaster = broadcaster(1024);
    let addr = broadcaster.start().unwrap();

    let mut healthy = FrameSubscriber::connect(addr).await.unwrap();
    let doomed = TcpStream::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 2).await;

    broadcaster.publish("before", "x").unwrap();
    drop(doomed);

    for n in 0..100u32 {
        broadcaster
            .publish(format!("{n}"), n.to_be_bytes().to_vec())
            .unwrap();
    }

    assert_eq!(next(&mut healthy).await, Frame::new("before", "x"));
    for n in 0..100u32 {
        let frame = next(&mut healthy).await;
        assert_eq!(frame.metadata(), &Bytes::from(format!("{n}")));
        assert_eq!(&frame.payload()[..], &n.to_be_bytes());
    }

    wait_for_subscribers(&broadcaster, 1).await;
}

#[tokio::test]
async fn frames_arrive_whole_under_concurrent_producers() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 250;

    let broadcaster = Arc::new(broadcaster((PRODUCERS * PER_PRODUCER) as usize));
    let addr = broadcaster.start().unwrap();

    let mut subscriber = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 1).await;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let broadcaster = Arc::clone(&broadcaster);
            std::thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    let metadata = format!("{p}:{seq}");
                    let payload = vec![p as u8; (seq as usize % 7) * 512 + 1];
                    broadcaster.publish(metadata, payload).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut last_seq: HashMap<u32, u32> = HashMap::new();
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let frame = next(&mut subscriber).await;
        let metadata = std::str::from_utf8(frame.metadata()).unwrap();
        let (p, seq) = metadata.split_once(':').unwrap();
        let (p, seq): (u32, u32) = (p.parse().unwrap(), seq.parse().unwrap());

        // Payload belongs to this metadata and nothing else.
        assert_eq!(frame.payload().len(), (seq as usize % 7) * 512 + 1);
        assert!(frame.payload().iter().all(|b| *b == p as u8));

        // Per-producer FIFO.
        if let Some(prev) = last_seq.insert(p, seq) {
            assert!(seq > prev, "producer {p}: {seq} after {prev}");
        }
    }
    assert_eq!(last_seq.len(), PRODUCERS as usize);
}

#[tokio::test]
async fn publish_does_not_block_on_stalled_subscriber() {
    let broadcaster = broadcaster(4);
    let addr = broadcaster.start().unwrap();

    // Never reads; its socket buffers fill and its send-loop stalls.
    let _stalled = TcpStream::connect(addr).await.unwrap();
    let mut watcher = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 2).await;

    let payload = Bytes::from(vec![0xAB; 64 * 1024]);
    let started = Instant::now();
    for n in 0..2_000u32 {
        assert_eq!(
            broadcaster.publish(format!("{n}"), payload.clone()).unwrap(),
            2
        );
    }
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(5), "publish took {elapsed:?}");
    assert!(broadcaster.stats().frames_evicted > 0);
    assert_eq!(broadcaster.subscriber_count(), 2);

    // The reading subscriber is still served.
    let frame = next(&mut watcher).await;
    assert_eq!(frame.payload().len(), 64 * 1024);
}

#[tokio::test]
async fn keep_latest_when_reader_falls_behind() {
    let broadcaster = broadcaster(0);
    let addr = broadcaster.start().unwrap();

    let mut subscriber = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 1).await;

    for n in 0..10_000u32 {
        broadcaster.publish(format!("{n}"), Bytes::new()).unwrap();
    }
    broadcaster.publish("last", Bytes::new()).unwrap();

    // Whatever was dropped in between, the final frame always arrives and
    // everything received is in publish order.
    let mut prev: Option<u32> = None;
    loop {
        let frame = next(&mut subscriber).await;
        let metadata = std::str::from_utf8(frame.metadata()).unwrap().to_string();
        if metadata == "last" {
            break;
        }
        let n: u32 = metadata.parse().unwrap();
        if let Some(prev) = prev {
            assert!(n > prev);
        }
        prev = Some(n);
    }
}

#[tokio::test]
async fn shutdown_disconnects_subscribers() {
    let broadcaster = broadcaster(0);
    let addr = broadcaster.start().unwrap();

    let mut subscriber = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 1).await;

    broadcaster.shutdown();

    let end = tokio::time::timeout(Duration::from_secs(5), subscriber.next_frame())
        .await
        .unwrap();
    assert!(matches!(end, Ok(None) | Err(_)));
    assert_eq!(broadcaster.subscriber_count(), 0);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn stats_track_delivery() {
    let broadcaster = broadcaster(16);
    let addr = broadcaster.start().unwrap();

    let mut subscriber = FrameSubscriber::connect(addr).await.unwrap();
    wait_for_subscribers(&broadcaster, 1).await;

    broadcaster.publish("meta", "payload").unwrap();
    next(&mut subscriber).await;

    // The counter is bumped on the I/O thread right after the write.
    tokio::time::timeout(Duration::from_secs(5), async {
        while broadcaster.stats().frames_sent == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let stats = broadcaster.stats();
    assert_eq!(stats.frames_published, 1);
    assert_eq!(stats.frames_fanned_out, 1);
    assert_eq!(stats.total_connections, 1);
    assert_eq!(stats.active_subscribers, 1);
    assert_eq!(stats.frames_sent, 1);
    assert_eq!(stats.bytes_sent, 11);
}
