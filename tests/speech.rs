//! Speech queue integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jarvis::Error;
use jarvis::speech::{ExclusivePlayer, SpeechBackend, SpeechOutput, SpeechWorker};
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

mod common;
use common::RecordingSpeech;

#[tokio::test]
async fn test_order_preserved_per_producer() {
    let speech = RecordingSpeech::new();
    let (output, rx) = SpeechOutput::channel(4);
    let stop = CancellationToken::new();
    let worker = SpeechWorker::new(
        rx,
        speech.clone(),
        Duration::from_secs(1),
        Duration::from_secs(5),
    );
    let worker = tokio::spawn(worker.run(stop.clone(), CancellationToken::new()));

    // holding the lock across `say` records the exact order items entered the queue
    let enqueued = Arc::new(Mutex::new(Vec::new()));
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let output = output.clone();
            let enqueued = Arc::clone(&enqueued);
            tokio::spawn(async move {
                for n in 0..5 {
                    let text = format!("{p}-{n}");
                    let mut order = enqueued.lock().await;
                    output.say(text.clone()).await.unwrap();
                    order.push(text);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    stop.cancel();
    worker.await.unwrap();

    let enqueued = enqueued.lock().await.clone();
    assert_eq!(enqueued.len(), 20);
    assert_eq!(speech.spoken(), enqueued);
}

/// Plays through the shared exclusive player and tracks overlap
struct BlockingSpeech {
    player: ExclusivePlayer,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    play_for: Duration,
}

#[async_trait]
impl SpeechBackend for BlockingSpeech {
    fn name(&self) -> &'static str {
        "blocking"
    }

    async fn speak(&self, _text: &str) -> jarvis::Result<()> {
        let active = Arc::clone(&self.active);
        let max_active = Arc::clone(&self.max_active);
        let play_for = self.play_for;

        self.player
            .play(move |cancel| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);

                let deadline = Instant::now() + play_for;
                while Instant::now() < deadline && !cancel.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(5));
                }

                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timed_out_playback_does_not_overlap_next() {
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let speech = Arc::new(BlockingSpeech {
        player: ExclusivePlayer::new(),
        active: Arc::clone(&active),
        max_active: Arc::clone(&max_active),
        play_for: Duration::from_millis(500),
    });

    let (output, rx) = SpeechOutput::channel(8);
    let stop = CancellationToken::new();
    let worker = SpeechWorker::new(
        rx,
        speech,
        Duration::from_millis(100),
        Duration::from_secs(5),
    );
    let worker = tokio::spawn(worker.run(stop.clone(), CancellationToken::new()));

    for text in ["раз", "два", "три"] {
        assert!(output.enqueue(text));
    }

    stop.cancel();
    worker.await.unwrap();

    // the last cancelled playback may still be winding down
    let settled = Instant::now() + Duration::from_secs(2);
    while active.load(Ordering::SeqCst) > 0 && Instant::now() < settled {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(active.load(Ordering::SeqCst), 0);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timed_out_item_is_dropped() {
    let speech = RecordingSpeech::stalling_on("медленно");
    let (output, rx) = SpeechOutput::channel(8);
    let stop = CancellationToken::new();
    let worker = SpeechWorker::new(
        rx,
        speech.clone(),
        Duration::from_millis(100),
        Duration::from_secs(5),
    );
    let worker = tokio::spawn(worker.run(stop.clone(), CancellationToken::new()));

    for text in ["раз", "медленно", "два"] {
        assert!(output.enqueue(text));
    }

    stop.cancel();
    worker.await.unwrap();

    assert_eq!(speech.spoken(), vec!["раз".to_string(), "два".to_string()]);
}

#[tokio::test]
async fn test_abort_cuts_drain_short() {
    let speech = RecordingSpeech::stalling_on("долго");
    let (output, rx) = SpeechOutput::channel(8);
    let stop = CancellationToken::new();
    let abort = CancellationToken::new();
    let worker = SpeechWorker::new(
        rx,
        speech.clone(),
        Duration::from_secs(60),
        Duration::from_secs(60),
    );

    for _ in 0..3 {
        assert!(output.enqueue("долго"));
    }

    stop.cancel();
    abort.cancel();

    let finished =
        tokio::time::timeout(Duration::from_secs(2), worker.run(stop, abort)).await;
    assert_ok!(finished);
    assert!(speech.spoken().is_empty());
}

#[tokio::test]
async fn test_enqueue_drops_when_full() {
    let (output, _rx) = SpeechOutput::channel(1);

    assert!(output.enqueue("первое"));
    assert!(!output.enqueue("второе"));
}

#[tokio::test]
async fn test_say_fails_without_worker() {
    let (output, rx) = SpeechOutput::channel(1);
    drop(rx);

    let err = assert_err!(output.say("никто не услышит").await);
    assert!(matches!(err, Error::QueueClosed("speech")));
    assert!(!output.enqueue("и это"));
}
