//! Benchmarks for the per-exchange hot paths of a polling loop: request
//! encoding, response parsing, and result-buffer decoding. No network is
//! involved; transport time dominates in production, these track the fixed
//! CPU cost added on top of it.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use s7comm::buffer::ResultBuffer;
use s7comm::command::{ReadRequest, RequestItem, SetupRequest, WriteRequest};
use s7comm::response::AckData;
use s7comm::Area;
use std::time::Duration;

/// Ack-data PDU answering a single read item, as received after a read
/// of `payload_len` bytes on a 240-byte PDU session.
fn canned_read_ack(payload_len: usize) -> Vec<u8> {
    let data_len = 4 + payload_len;
    let mut pdu = Vec::with_capacity(12 + 2 + data_len);
    pdu.extend_from_slice(&[0x32, 0x03, 0x00, 0x00, 0x00, 0x01]);
    pdu.extend_from_slice(&2u16.to_be_bytes());
    pdu.extend_from_slice(&(data_len as u16).to_be_bytes());
    pdu.extend_from_slice(&[0x00, 0x00]);
    pdu.extend_from_slice(&[0x04, 0x01]);
    pdu.push(0xFF);
    pdu.push(0x04);
    pdu.extend_from_slice(&((payload_len * 8) as u16).to_be_bytes());
    for i in 0..payload_len {
        pdu.push((i % 251) as u8);
    }
    pdu
}

fn benchmark_request_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encoding");

    group.bench_function("read_request", |b| {
        b.iter(|| {
            let item = RequestItem::bytes(Area::DataBlock, 150, 0, 222).unwrap();
            let request = ReadRequest::new(1, vec![item]).unwrap();
            black_box(request.to_bytes())
        });
    });

    group.bench_function("write_request", |b| {
        let payload: Vec<u8> = (0..212u32).map(|i| (i % 251) as u8).collect();
        b.iter(|| {
            let item = RequestItem::bytes(Area::DataBlock, 150, 0, 212).unwrap();
            let request = WriteRequest::new(1, item, payload.clone()).unwrap();
            black_box(request.to_bytes())
        });
    });

    group.bench_function("setup_request", |b| {
        b.iter(|| black_box(SetupRequest::new(1, 480).to_bytes()));
    });

    group.finish();
}

fn benchmark_response_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_parsing");

    let setup_ack = hex::decode("320300000001000800000000f0000001000100f0").unwrap();
    group.bench_function("setup_ack", |b| {
        b.iter(|| {
            let ack = AckData::from_pdu(black_box(&setup_ack)).unwrap();
            black_box(ack.negotiated_pdu_length().unwrap())
        });
    });

    // one full-chunk read on a 240-byte PDU
    let read_ack = canned_read_ack(222);
    group.bench_function("read_ack_222_bytes", |b| {
        b.iter(|| {
            let ack = AckData::from_pdu(black_box(&read_ack)).unwrap();
            ack.check_errors().unwrap();
            black_box(ack.read_items(1).unwrap())
        });
    });

    group.finish();
}

fn benchmark_buffer_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_decoding");

    let image: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    let mut buffer = ResultBuffer::new();
    buffer.fill(&image);

    group.bench_function("f32_sweep", |b| {
        b.iter(|| {
            for offset in (0..1024).step_by(4) {
                black_box(buffer.get_f32(offset).unwrap());
            }
        });
    });

    group.bench_function("u16_sweep", |b| {
        b.iter(|| {
            for offset in (0..1024).step_by(2) {
                black_box(buffer.get_u16(offset).unwrap());
            }
        });
    });

    group.bench_function("fill_1024", |b| {
        let mut target = ResultBuffer::new();
        b.iter(|| {
            target.fill(black_box(&image));
            black_box(target.len())
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(100)
        .measurement_time(Duration::from_secs(5));
    targets = benchmark_request_encoding, benchmark_response_parsing, benchmark_buffer_decoding
}

criterion_main!(benches);
