//! End-to-end reads of reconstructed volumes.

mod common;

use common::{byte_at, slab_record, volume_tail, PatternSource, RecordWriter};
use pool_reader::config::{CURRENT_BLOCK_SIZE, CURRENT_DATA_AREA_OFFSET, LEGACY_BLOCK_SIZE};
use pool_reader::records::{decode_records, SchemaDetector, SlabAllocationRecord};
use pool_reader::storage::DiskSource;
use pool_reader::volume::COPY_CHUNK;
use pool_reader::{Error, PoolGeneration, StreamConfig, VolumeMap, VolumeStream};
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;
use uuid::Uuid;

const BS: u64 = LEGACY_BLOCK_SIZE;
const ORIGIN: u64 = 0x8000;

fn slab(volume_block: u64, physical_disk_block: u64) -> SlabAllocationRecord {
    SlabAllocationRecord {
        volume_id: 1,
        volume_block,
        parity_sequence: 0,
        mirror_sequence: 0,
        physical_disk_id: 1,
        physical_disk_block,
    }
}

/// Legacy volume of 4 blocks; only virtual block 1 is allocated, on physical block 0.
fn legacy_stream() -> VolumeStream<PatternSource> {
    let map = VolumeMap::build(PoolGeneration::Legacy, 4, &[slab(1, 0)]).unwrap();
    let source = PatternSource::new(ORIGIN + 6 * BS);
    VolumeStream::with_map(source, ORIGIN, Arc::new(map))
}

#[test]
fn test_legacy_mapped_block() {
    let mut stream = legacy_stream();
    assert_eq!(stream.len(), 4 * BS);

    stream.seek(SeekFrom::Start(BS)).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(stream.read_span(&mut buf, 0, 16).unwrap(), 16);

    let expected: Vec<u8> = (0..16).map(|i| byte_at(ORIGIN + 2 * BS + i)).collect();
    assert_eq!(buf.to_vec(), expected);
    assert_eq!(stream.into_inner().seeks, vec![ORIGIN + 2 * BS]);
}

#[test]
fn test_legacy_hole_is_zero() {
    let mut stream = legacy_stream();
    let mut buf = [0x5Au8; 16];
    assert_eq!(stream.read_span(&mut buf, 0, 16).unwrap(), 16);
    assert_eq!(buf, [0u8; 16]);
    assert!(stream.into_inner().seeks.is_empty());
}

#[test]
fn test_straddle_hole_and_mapped_block() {
    let mut stream = legacy_stream();
    stream.seek(SeekFrom::Start(BS - 8)).unwrap();
    let mut buf = [0xA5u8; 24];
    stream.read_exact(&mut buf).unwrap();

    assert_eq!(&buf[..8], &[0u8; 8]);
    for i in 0..16 {
        assert_eq!(buf[8 + i], byte_at(ORIGIN + 2 * BS + i as u64));
    }

    let source = stream.into_inner();
    assert_eq!(source.seeks.len(), 1);
    assert_eq!(source.reads, 1);
}

#[test]
fn test_straddle_mapped_block_and_hole() {
    let mut stream = legacy_stream();
    stream.seek(SeekFrom::Start(2 * BS - 4)).unwrap();
    let mut buf = [0xA5u8; 12];
    assert_eq!(stream.read_span(&mut buf, 0, 12).unwrap(), 12);

    for i in 0..4 {
        assert_eq!(buf[i], byte_at(ORIGIN + 3 * BS - 4 + i as u64));
    }
    assert_eq!(&buf[4..], &[0u8; 8]);
    assert_eq!(stream.into_inner().seeks, vec![ORIGIN + 3 * BS - 4]);
}

#[test]
fn test_read_past_end_returns_count() {
    let mut stream = legacy_stream();
    stream.seek(SeekFrom::Start(4 * BS)).unwrap();
    let mut buf = [9u8; 512];
    assert_eq!(stream.read_span(&mut buf, 0, 512).unwrap(), 512);
    assert_eq!(buf, [9u8; 512]);

    stream.seek(SeekFrom::End(4096)).unwrap();
    assert_eq!(stream.read_span(&mut buf, 256, 256).unwrap(), 256);
    assert!(stream.into_inner().seeks.is_empty());
}

#[test]
fn test_repeated_reads_are_identical() {
    let mut stream = legacy_stream();
    let mut reads = Vec::new();
    for _ in 0..3 {
        stream.seek(SeekFrom::Start(0)).unwrap();
        stream.seek(SeekFrom::Current((BS - 100) as i64)).unwrap();
        let mut buf = vec![0u8; 300];
        stream.read_exact(&mut buf).unwrap();
        reads.push(buf);
    }
    assert_eq!(reads[0], reads[1]);
    assert_eq!(reads[1], reads[2]);
    assert_eq!(stream.map().table().lookup(1), Some(0));
}

fn volume_region(number: u64, block_count: u64) -> Vec<u8> {
    let mut w = RecordWriter::new();
    w.int(number)
        .int(9)
        .guid(Uuid::parse_str("3f2504e0-4f89-41d3-9a0c-0305e82c3301").unwrap())
        .text("Recovered");
    volume_tail(&mut w, "Two-way mirror", block_count);
    w.into_bytes()
}

#[test]
fn test_open_from_decoded_records() {
    let volumes_bytes = [volume_region(1, 8), volume_region(2, 3 * CURRENT_BLOCK_SIZE)].concat();
    let slab_bytes = [
        slab_record(1, 0, 1, 40),
        slab_record(2, 0, 1, 5),
        slab_record(2, 2, 1, 1),
    ]
    .concat();

    let mut detector = SchemaDetector::new();
    let volumes = decode_records(&volumes_bytes, |c| detector.decode_volume(c)).unwrap();
    let slabs = decode_records(&slab_bytes, SlabAllocationRecord::decode).unwrap();
    assert_eq!(volumes[1].number, 2);

    let config = StreamConfig::new(PoolGeneration::Current, 0);
    let source = PatternSource::new(CURRENT_DATA_AREA_OFFSET + 8 * CURRENT_BLOCK_SIZE);
    let mut stream = VolumeStream::open(source, &config, &volumes[1], &slabs).unwrap();

    assert_eq!(stream.len(), 3 * CURRENT_BLOCK_SIZE);
    assert_eq!(stream.map().table().len(), 2);

    let mut first = [0u8; 4];
    stream.read_exact(&mut first).unwrap();
    assert_eq!(first[0], byte_at(CURRENT_DATA_AREA_OFFSET + 5 * CURRENT_BLOCK_SIZE));

    stream.seek(SeekFrom::Start(CURRENT_BLOCK_SIZE)).unwrap();
    stream.read_exact(&mut first).unwrap();
    assert_eq!(first, [0u8; 4]);

    stream.seek(SeekFrom::Start(2 * CURRENT_BLOCK_SIZE + 3)).unwrap();
    stream.read_exact(&mut first).unwrap();
    assert_eq!(first[0], byte_at(CURRENT_DATA_AREA_OFFSET + CURRENT_BLOCK_SIZE + 3));
}

#[test]
fn test_io_copy_stops_at_end() {
    let map = VolumeMap::build(PoolGeneration::Current, 2 * CURRENT_BLOCK_SIZE, &[slab(1, 0)])
        .unwrap();
    let source = PatternSource::new(CURRENT_DATA_AREA_OFFSET + CURRENT_BLOCK_SIZE);
    let mut stream = VolumeStream::with_map(source, 0, Arc::new(map));

    let copied = io::copy(&mut stream, &mut io::sink()).unwrap();
    assert_eq!(copied, 2 * CURRENT_BLOCK_SIZE);
}

/// Sparse disk image: pool data area at `origin`, blocks filled with a tag byte.
fn disk_image(origin: u64, blocks: &[(u64, u8)]) -> NamedTempFile {
    let image = NamedTempFile::new().unwrap();
    let mut file = OpenOptions::new().write(true).open(image.path()).unwrap();
    file.set_len(origin + CURRENT_DATA_AREA_OFFSET + 4 * CURRENT_BLOCK_SIZE)
        .unwrap();
    for (physical, tag) in blocks {
        let at = origin + CURRENT_DATA_AREA_OFFSET + physical * CURRENT_BLOCK_SIZE;
        file.seek(SeekFrom::Start(at)).unwrap();
        file.write_all(&vec![*tag; CURRENT_BLOCK_SIZE as usize]).unwrap();
    }
    image
}

#[test]
fn test_disk_image_extract() {
    let origin = 0x10_0000;
    let image = disk_image(origin, &[(0, 0xA1), (3, 0xB2)]);
    let slabs = [slab(2, 3), slab(0, 0)];
    let map = VolumeMap::build(PoolGeneration::Current, 3 * CURRENT_BLOCK_SIZE, &slabs).unwrap();

    let disk = DiskSource::open(image.path()).unwrap();
    let mut stream = VolumeStream::with_map(disk, origin, Arc::new(map));

    let output = NamedTempFile::new().unwrap();
    let mut dest = OpenOptions::new().write(true).open(output.path()).unwrap();
    dest.set_len(stream.len()).unwrap();

    let mut last = (0, 0);
    let written = stream
        .copy_to(&mut dest, |done, total| {
            assert!(done >= last.0);
            last = (done, total);
            Ok(())
        })
        .unwrap();
    assert_eq!(written, 2 * CURRENT_BLOCK_SIZE);
    assert_eq!(last, (4 * CURRENT_BLOCK_SIZE, 4 * CURRENT_BLOCK_SIZE));

    let extracted = std::fs::read(output.path()).unwrap();
    let mb = CURRENT_BLOCK_SIZE as usize;
    assert_eq!(extracted.len(), 3 * mb);
    assert!(extracted[..mb].iter().all(|b| *b == 0xA1));
    assert!(extracted[mb..2 * mb].iter().all(|b| *b == 0));
    assert!(extracted[2 * mb..].iter().all(|b| *b == 0xB2));

    // The stream reads the same bytes the extraction produced.
    let mut via_stream = Vec::new();
    stream.seek(SeekFrom::Start(0)).unwrap();
    stream.read_to_end(&mut via_stream).unwrap();
    assert_eq!(via_stream, extracted);
}

/// Destination that checks written bytes against the pattern instead of storing them.
struct PatternCheck {
    expected_base: u64,
    pos: u64,
    written: u64,
    largest_write: usize,
}

impl Write for PatternCheck {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let (Some(first), Some(last)) = (buf.first(), buf.last()) {
            let at = self.expected_base + self.pos;
            assert_eq!(*first, byte_at(at));
            assert_eq!(*last, byte_at(at + buf.len() as u64 - 1));
        }
        self.pos += buf.len() as u64;
        self.written += buf.len() as u64;
        self.largest_write = self.largest_write.max(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for PatternCheck {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(n) => self.pos = n,
            other => panic!("unexpected seek {:?}", other),
        }
        Ok(self.pos)
    }
}

#[test]
fn test_legacy_copy_is_chunked() {
    let mut stream = legacy_stream();
    let mut dest = PatternCheck {
        // Volume offset BS is read from ORIGIN + 2 * BS.
        expected_base: ORIGIN + BS,
        pos: 0,
        written: 0,
        largest_write: 0,
    };

    let mut calls = 0u64;
    let mut last = 0;
    let written = stream
        .copy_to(&mut dest, |done, total| {
            assert_eq!(total, 2 * BS);
            assert!(done >= last);
            last = done;
            calls += 1;
            Ok(())
        })
        .unwrap();

    let chunks = BS / COPY_CHUNK;
    assert_eq!(written, BS);
    assert_eq!(dest.written, BS);
    assert_eq!(dest.largest_write as u64, COPY_CHUNK);
    assert_eq!(calls, 4 * chunks);
    assert_eq!(last, 2 * BS);

    let source = stream.into_inner();
    assert_eq!(source.seeks, vec![ORIGIN + 2 * BS]);
    assert_eq!(source.reads as u64, chunks);
}

#[test]
fn test_open_rejects_unaddressable_slab() {
    let volumes_bytes = volume_region(1, 4);
    let slab_bytes = slab_record(1, 0, 1, 0x0123_4567_89AB);

    let mut detector = SchemaDetector::new();
    let volumes = decode_records(&volumes_bytes, |c| detector.decode_volume(c)).unwrap();
    let slabs = decode_records(&slab_bytes, SlabAllocationRecord::decode).unwrap();

    let config = StreamConfig::new(PoolGeneration::Legacy, ORIGIN);
    let result = VolumeStream::open(PatternSource::new(0), &config, &volumes[0], &slabs);
    match result {
        Err(Error::BlockOutOfRange { block }) => assert_eq!(block, 0x0123_4567_89AB),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("slab beyond the address space was accepted"),
    }
}
