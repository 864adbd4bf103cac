use std::time::Duration;

use tokio::sync::mpsc;
use warp::Filter;

/// Serve `unary` on `/tts/predict` and flush each of `segments` separately
/// on `/tts/stream-predict`.
pub async fn spawn_mock_tts(
    unary: &'static [u8],
    segments: Vec<&'static [u8]>,
) -> (String, mpsc::Sender<()>) {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let predict = warp::post()
        .and(warp::path!("tts" / "predict"))
        .map(move || warp::reply::Response::new(unary.into()));
    let stream = warp::get()
        .and(warp::path!("tts" / "stream-predict"))
        .map(move || {
            let segments = segments.clone();
            let (mut tx, body) = warp::hyper::Body::channel();
            tokio::spawn(async move {
                for segment in segments {
                    if tx.send_data(segment.into()).await.is_err() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            });
            warp::reply::Response::new(body)
        });

    let (addr, server) = warp::serve(predict.or(stream))
        .bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
            shutdown_rx.recv().await;
        });
    tokio::spawn(server);
    let url = format!("http://{}", addr);
    (url, shutdown_tx)
}
