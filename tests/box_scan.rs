use std::io::Cursor;

use vapack::{BoxHeader, BoxType, find_box, mp4_box::{find_box_in, read_payload}, wrap};

fn box_of_len(total_len: u32, tag: &[u8; 4], fill: u8) -> Vec<u8> {
    let mut v = total_len.to_be_bytes().to_vec();
    v.extend_from_slice(tag);
    v.resize(total_len as usize, fill);
    v
}

#[test]
fn wrapped_payload_round_trips() {
    for len in [0usize, 1, 65_536] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let boxed = wrap(&payload, BoxType::VAPC).unwrap();
        assert_eq!(boxed.len(), len + 8);
        assert_eq!(&boxed[..4], &((len + 8) as u32).to_be_bytes());
        assert_eq!(&boxed[4..8], b"vapc");

        let mut cursor = Cursor::new(&boxed);
        let loc = find_box(&mut cursor, BoxType::VAPC).unwrap().unwrap();
        assert_eq!(loc.payload_length, len as u64);
        assert_eq!(loc.payload_offset, 8);
        assert_eq!(read_payload(&mut cursor, &loc).unwrap(), payload);
    }
}

#[test]
fn scan_stays_in_sync_across_boxes_of_varying_size() {
    let mut stream = box_of_len(16, b"ftyp", 0x11);
    stream.extend(box_of_len(40, b"moov", 0x22));
    stream.extend(box_of_len(24, b"vapc", 0x33));

    let loc = find_box_in(&stream, BoxType::VAPC).unwrap();
    assert_eq!(loc.box_offset, 56);
    assert_eq!(loc.payload_offset, 64);
    assert_eq!(loc.payload_length, 16);
    assert_eq!(
        read_payload(&mut Cursor::new(&stream), &loc).unwrap(),
        vec![0x33; 16]
    );

    let moov = find_box_in(&stream, BoxType(*b"moov")).unwrap();
    assert_eq!((moov.box_offset, moov.payload_length), (16, 32));
}

#[test]
fn absent_tag_is_not_found() {
    let mut stream = box_of_len(16, b"ftyp", 0);
    stream.extend(box_of_len(8, b"free", 0));
    assert_eq!(find_box_in(&stream, BoxType::VAPC), None);
    assert_eq!(find_box_in(&[], BoxType::VAPC), None);
}

#[test]
fn truncated_input_is_not_found_rather_than_an_error() {
    // Trailing partial header.
    let mut stream = box_of_len(16, b"ftyp", 0);
    stream.extend_from_slice(&[0, 0, 0]);
    assert_eq!(find_box_in(&stream, BoxType::VAPC), None);

    // Target box claims more bytes than the stream holds.
    let mut cut = box_of_len(16, b"ftyp", 0);
    cut.extend(box_of_len(64, b"vapc", 1));
    cut.truncate(16 + 20);
    assert_eq!(find_box_in(&cut, BoxType::VAPC), None);

    // Length smaller than the header itself.
    let mut bad = 4u32.to_be_bytes().to_vec();
    bad.extend_from_slice(b"junk");
    bad.extend(box_of_len(8, b"vapc", 0));
    assert_eq!(find_box_in(&bad, BoxType::VAPC), None);
}

#[test]
fn header_codec_is_big_endian() {
    let header = BoxHeader::for_payload(0x0102, BoxType::VAPC).unwrap();
    assert_eq!(header.encode(), [0, 0, 0x01, 0x0a, b'v', b'a', b'p', b'c']);
    assert_eq!(BoxHeader::decode(header.encode()), header);
}
