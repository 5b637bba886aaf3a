//! Disk Queue Benchmarks
//!
//! Measures put throughput across payload sizes and the put → publish → read
//! round trip, the two paths a broker exercises on every message.
//!
//! ```bash
//! cargo bench -p queuehouse-storage
//! cargo bench -p queuehouse-storage -- put/4096
//! ```

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use queuehouse_storage::{DiskQueueReader, DiskQueueWriter, QueueConfig};
use tempfile::TempDir;

fn bench_config() -> QueueConfig {
    QueueConfig {
        max_bytes_per_file: 1024 * 768 * 100,
        min_msg_size: 0,
        max_msg_size: 1 << 20,
        sync_every: 2500,
        sync_timeout: Duration::from_secs(2),
        read_buffer_enabled: true,
    }
}

fn bench_put(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("put");

    for size in [16usize, 256, 4096, 65536] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let tmp = TempDir::new().unwrap();
            let writer = rt.block_on(async {
                Arc::new(
                    DiskQueueWriter::new("bench_put", tmp.path(), bench_config())
                        .await
                        .unwrap(),
                )
            });
            let data = vec![0u8; size];

            b.to_async(&rt).iter(|| {
                let writer = Arc::clone(&writer);
                let data = data.clone();
                async move {
                    writer.put(&data).await.unwrap();
                }
            });

            rt.block_on(async {
                writer.close().await.unwrap();
            });
        });
    }
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("roundtrip");

    for size in [256usize, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let tmp = TempDir::new().unwrap();
            let (writer, reader) = rt.block_on(async {
                let writer = Arc::new(
                    DiskQueueWriter::new("bench_rt", tmp.path(), bench_config())
                        .await
                        .unwrap(),
                );
                let reader = Arc::new(
                    DiskQueueReader::new("bench_rt", "bench_rt", tmp.path(), bench_config())
                        .await
                        .unwrap(),
                );
                (writer, reader)
            });
            let data = vec![0u8; size];

            b.to_async(&rt).iter(|| {
                let writer = Arc::clone(&writer);
                let reader = Arc::clone(&reader);
                let data = data.clone();
                async move {
                    let end = writer.put(&data).await.unwrap();
                    reader.update_queue_end(end).await.unwrap();
                    reader.read_chan().recv().await.unwrap();
                }
            });

            rt.block_on(async {
                reader.close().await.unwrap();
                writer.close().await.unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_put, bench_roundtrip);
criterion_main!(benches);
