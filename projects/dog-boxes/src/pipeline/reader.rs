// Reader worker: decodes frames from a video and sends them through a channel

use crate::error::JobResult;
use crate::pipeline::types::RawFrame;
use crate::video::opencv_reader::OpencvReader;
use crossbeam::channel::Sender;
use std::path::Path;

/// Decodes `video_path` front to back and sends each frame downstream in
/// stream order. Stops early when the receiver hangs up.
/// Returns the total number of frames read.
pub fn read_worker(tx: Sender<RawFrame>, video_path: &Path) -> JobResult<usize> {
    // Each worker gets its own reader instance (must be created inside the thread)
    let mut reader = OpencvReader::open(video_path)?;
    let mut frames_read = 0;

    while let Some(mat) = reader.read_or_end() {
        if tx
            .send(RawFrame {
                id: frames_read,
                mat,
            })
            .is_err()
        {
            tracing::debug!("Reader worker: receiver closed after {} frames", frames_read);
            break;
        }
        frames_read += 1;
    }

    reader.release()?;
    Ok(frames_read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::write_clip;
    use crossbeam::channel;

    #[test]
    fn test_read_worker_sends_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        write_clip(&path, 64, 48, 10.0, 6);

        let (tx, rx) = channel::unbounded();
        let frames_read = read_worker(tx, &path).unwrap();
        assert_eq!(frames_read, 6);

        let ids: Vec<usize> = rx.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_read_worker_stops_when_receiver_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        write_clip(&path, 64, 48, 10.0, 6);

        let (tx, rx) = channel::bounded(1);
        drop(rx);
        assert_eq!(read_worker(tx, &path).unwrap(), 0);
    }
}
