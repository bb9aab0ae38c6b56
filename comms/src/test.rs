#![cfg(test)]

use std::io;

use serde_json::json;
use tokio::io::{self as tio, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

use crate::{
    FrameReceiver, FrameSender,
    msg::{FeedKind, Request, Response},
};

fn channel_pair() -> (
    (
        FrameReceiver<ReadHalf<DuplexStream>>,
        FrameSender<WriteHalf<DuplexStream>>,
    ),
    (
        FrameReceiver<ReadHalf<DuplexStream>>,
        FrameSender<WriteHalf<DuplexStream>>,
    ),
) {
    let (stream1, stream2) = tio::duplex(4096);
    let (rx1, tx1) = tio::split(stream1);
    let (rx2, tx2) = tio::split(stream2);
    (crate::channel(rx1, tx1), crate::channel(rx2, tx2))
}

#[tokio::test]
async fn test_request_round_trip() {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    let sent = Request::Submit {
        feed: FeedKind::Training,
        data: Some(json!({"x": 1.0, "sensor-type": "accelerometer"})),
    };
    tx.send(&sent).await.unwrap();

    let Request::Submit { feed, data } = rx.recv().await.unwrap();
    assert_eq!(feed, FeedKind::Training);
    assert_eq!(data.unwrap()["sensor-type"], "accelerometer");
}

#[tokio::test]
async fn test_submit_without_data_decodes_to_none() {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    tx.send(&json!({"submit": {"feed": "inference"}}))
        .await
        .unwrap();

    let Request::Submit { feed, data } = rx.recv().await.unwrap();
    assert_eq!(feed, FeedKind::Inference);
    assert!(data.is_none());
}

#[tokio::test]
async fn test_response_wire_format() {
    assert_eq!(
        serde_json::to_string(&Response::ACK).unwrap(),
        r#"{"status-code":0}"#
    );
    assert_eq!(
        serde_json::to_string(&Response::NACK).unwrap(),
        r#"{"status-code":-1}"#
    );
    assert!(Response::ACK.is_ack());
    assert!(!Response::NACK.is_ack());
}

#[tokio::test]
async fn test_undecodable_body_keeps_stream_aligned() {
    let (mut stream1, stream2) = tio::duplex(4096);
    let (rx2, tx2) = tio::split(stream2);
    let (mut rx, _tx) = crate::channel(rx2, tx2);

    // A well-framed body that is not a Request, then a valid one.
    let garbage = br#"{"not": "a request"}"#;
    stream1
        .write_all(&(garbage.len() as u64).to_be_bytes())
        .await
        .unwrap();
    stream1.write_all(garbage).await.unwrap();

    let valid = serde_json::to_vec(&Request::Submit {
        feed: FeedKind::Training,
        data: None,
    })
    .unwrap();
    stream1
        .write_all(&(valid.len() as u64).to_be_bytes())
        .await
        .unwrap();
    stream1.write_all(&valid).await.unwrap();

    let err = rx.recv::<Request>().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    rx.recv::<Request>().await.unwrap();
}

#[tokio::test]
async fn test_eof_surfaces_as_unexpected_eof() {
    let ((mut rx, _), (peer_rx, peer_tx)) = channel_pair();
    drop((peer_rx, peer_tx));

    let err = rx.recv::<Response>().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn test_oversized_frame_rejected() {
    let (mut stream1, stream2) = tio::duplex(64);
    let (rx2, tx2) = tio::split(stream2);
    let (mut rx, _tx) = crate::channel(rx2, tx2);

    let huge = u64::MAX.to_be_bytes();
    stream1.write_all(&huge).await.unwrap();

    let err = rx.recv::<Request>().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}
