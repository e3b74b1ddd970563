use super::depth_frame::DepthFrame;
use crate::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Forwards newline-delimited JSON depth frames from `reader` until EOF or shutdown.
///
/// Malformed lines are skipped. When the supervisor lags behind, the newest frame
/// is dropped instead of blocking the camera side.
pub async fn forward_depth_frames<R>(
    reader: R,
    frames: mpsc::Sender<DepthFrame>,
    shutdown: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let text = match line {
            Ok(Some(text)) => text,
            Ok(None) => {
                info!("Depth frame feed closed");
                break;
            }
            Err(e) => {
                warn!("Depth frame feed failed: {e}");
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DepthFrame>(&text) {
            Ok(frame) => {
                if frames.try_send(frame).is_err() {
                    debug!("Supervisor busy, dropping depth frame {}", frame.timestamp_ms());
                }
            }
            Err(e) => warn!("Skipping malformed depth frame: {e}"),
        }
    }
}
