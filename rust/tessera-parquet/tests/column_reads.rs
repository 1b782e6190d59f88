//! End-to-end column reads over hand-built page streams.

use tessera_parquet::meta::{
    ColumnChunkMeta, ColumnDescriptor, CompressionCodec, ConvertedType, DataPageHeader,
    DataPageHeaderV2, DictionaryPageHeader, MemoryPageSource, PageEncoding, PageHeader, PageType,
    PhysicalType, TimestampUnit,
};
use tessera_parquet::{AnyColumnReader, ColumnReader, ListReader, StructReader};
use tessera_vector::{ColumnType, ColumnVector, StructField};

fn push_uleb(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Encodes levels as a sequence of repeated runs, one per stretch of equal
/// values.
fn rle_encode(levels: &[u8], bit_width: u32) -> Vec<u8> {
    let byte_width = bit_width.div_ceil(8) as usize;
    let mut out = Vec::new();
    let mut i = 0;
    while i < levels.len() {
        let mut end = i + 1;
        while end < levels.len() && levels[end] == levels[i] {
            end += 1;
        }
        push_uleb(&mut out, ((end - i) as u64) << 1);
        for b in 0..byte_width {
            out.push(levels[i] >> (b * 8));
        }
        i = end;
    }
    out
}

/// Level section of a V1 page: 4-byte length prefix plus RLE bytes.
fn level_section(levels: &[u8], bit_width: u32) -> Vec<u8> {
    let encoded = rle_encode(levels, bit_width);
    let mut out = Vec::new();
    out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    out.extend_from_slice(&encoded);
    out
}

fn v1_page(
    num_values: u64,
    encoding: PageEncoding,
    body: Vec<u8>,
    codec: CompressionCodec,
) -> (PageHeader, Vec<u8>) {
    let uncompressed_len = body.len() as u64;
    let body = match codec {
        CompressionCodec::Uncompressed => body,
        CompressionCodec::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            std::io::Write::write_all(&mut encoder, &body).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Snappy => snap::raw::Encoder::new().compress_vec(&body).unwrap(),
        CompressionCodec::Zstd => zstd::bulk::compress(&body, 1).unwrap(),
        other => panic!("codec {other:?} not used in these tests"),
    };
    (
        PageHeader {
            page_type: PageType::DataPage,
            uncompressed_page_size: uncompressed_len,
            compressed_page_size: body.len() as u64,
            data_header: Some(DataPageHeader {
                num_values,
                encoding,
            }),
            data_header_v2: None,
            dictionary_header: None,
        },
        body,
    )
}

fn dict_page(num_values: u64, body: Vec<u8>) -> (PageHeader, Vec<u8>) {
    (
        PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: body.len() as u64,
            compressed_page_size: body.len() as u64,
            data_header: None,
            data_header_v2: None,
            dictionary_header: Some(DictionaryPageHeader {
                num_values,
                encoding: PageEncoding::Plain,
            }),
        },
        body,
    )
}

fn chunk(num_values: u64, codec: CompressionCodec) -> ColumnChunkMeta {
    ColumnChunkMeta {
        num_values,
        data_page_offset: 4,
        dictionary_page_offset: None,
        total_compressed_size: 0,
        codec,
    }
}

fn leaf_reader(
    desc: ColumnDescriptor,
    output: ColumnType,
    num_values: u64,
    codec: CompressionCodec,
    pages: Vec<(PageHeader, Vec<u8>)>,
) -> ColumnReader {
    ColumnReader::new(
        desc,
        chunk(num_values, codec),
        output,
        Box::new(MemoryPageSource::new(pages)),
    )
    .unwrap()
}

#[test]
fn test_plain_int32_across_pages() {
    let first: Vec<u8> = (0i32..600).flat_map(|v| v.to_le_bytes()).collect();
    let second: Vec<u8> = (600i32..1000).flat_map(|v| v.to_le_bytes()).collect();
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 0, 0),
        ColumnType::Int32,
        1000,
        CompressionCodec::Uncompressed,
        vec![
            v1_page(600, PageEncoding::Plain, first, CompressionCodec::Uncompressed),
            v1_page(400, PageEncoding::Plain, second, CompressionCodec::Uncompressed),
        ],
    );

    let mut out = ColumnVector::new(ColumnType::Int32, 1000);
    let mut define = vec![0u8; 1000];
    let mut repeat = vec![0u8; 1000];
    // A batch that straddles the page boundary.
    assert_eq!(reader.read(700, &mut define, &mut repeat, &mut out, 0).unwrap(), 700);
    assert_eq!(reader.read(300, &mut define, &mut repeat, &mut out, 700).unwrap(), 300);
    for i in 0..1000 {
        assert_eq!(out.value::<i32>(i), i as i32);
        assert!(!out.is_null(i));
    }
}

#[test]
fn test_nullable_int64_definition_levels() {
    let defines = [1u8, 0, 1, 1, 0, 1];
    let values: Vec<u8> = [10i64, 20, 30, 40]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let mut body = level_section(&defines, 1);
    body.extend_from_slice(&values);
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int64, 1, 0),
        ColumnType::Int64,
        6,
        CompressionCodec::Uncompressed,
        vec![v1_page(6, PageEncoding::Plain, body, CompressionCodec::Uncompressed)],
    );

    let mut out = ColumnVector::new(ColumnType::Int64, 6);
    let mut define = vec![0u8; 6];
    let mut repeat = vec![0u8; 6];
    reader.read(6, &mut define, &mut repeat, &mut out, 0).unwrap();

    assert_eq!(define, vec![1, 0, 1, 1, 0, 1]);
    assert!(out.is_null(1));
    assert!(out.is_null(4));
    assert_eq!(out.value::<i64>(0), 10);
    assert_eq!(out.value::<i64>(2), 20);
    assert_eq!(out.value::<i64>(3), 30);
    assert_eq!(out.value::<i64>(5), 40);
}

#[test]
fn test_boolean_rle_page_round_trip() {
    // RLE-encoded booleans [true, true, false, true] with a length prefix.
    let encoded = rle_encode(&[1, 1, 0, 1], 1);
    let mut body = (encoded.len() as u32).to_le_bytes().to_vec();
    body.extend_from_slice(&encoded);
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Boolean, 0, 0),
        ColumnType::Bool,
        4,
        CompressionCodec::Uncompressed,
        vec![v1_page(4, PageEncoding::Rle, body, CompressionCodec::Uncompressed)],
    );
    let mut out = ColumnVector::new(ColumnType::Bool, 4);
    let mut define = vec![0u8; 4];
    let mut repeat = vec![0u8; 4];
    reader.read(4, &mut define, &mut repeat, &mut out, 0).unwrap();
    let got: Vec<u8> = (0..4).map(|i| out.value::<u8>(i)).collect();
    assert_eq!(got, vec![1, 1, 0, 1]);
}

#[test]
fn test_plain_boolean_bit_positions() {
    // Bits cross a read boundary mid-byte.
    let body = vec![0b1010_0110u8, 0b0000_0001];
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Boolean, 0, 0),
        ColumnType::Bool,
        9,
        CompressionCodec::Uncompressed,
        vec![v1_page(9, PageEncoding::Plain, body, CompressionCodec::Uncompressed)],
    );
    let mut out = ColumnVector::new(ColumnType::Bool, 9);
    let mut define = vec![0u8; 9];
    let mut repeat = vec![0u8; 9];
    reader.read(5, &mut define, &mut repeat, &mut out, 0).unwrap();
    reader.read(4, &mut define, &mut repeat, &mut out, 5).unwrap();
    let got: Vec<u8> = (0..9).map(|i| out.value::<u8>(i)).collect();
    assert_eq!(got, vec![0, 1, 1, 0, 0, 1, 0, 1, 1]);
}

fn string_dict_pages(dict: &[&str], indices: &[u8]) -> Vec<(PageHeader, Vec<u8>)> {
    let mut dict_body = Vec::new();
    for s in dict {
        dict_body.extend_from_slice(&(s.len() as u32).to_le_bytes());
        dict_body.extend_from_slice(s.as_bytes());
    }
    let mut data_body = vec![2u8]; // dictionary index bit width
    data_body.extend_from_slice(&rle_encode(indices, 2));
    vec![
        dict_page(dict.len() as u64, dict_body),
        v1_page(
            indices.len() as u64,
            PageEncoding::RleDictionary,
            data_body,
            CompressionCodec::Uncompressed,
        ),
    ]
}

#[test]
fn test_string_dictionary_lookup() {
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::ByteArray, 0, 0),
        ColumnType::String,
        5,
        CompressionCodec::Uncompressed,
        string_dict_pages(&["red", "green", "blue"], &[2, 0, 0, 1, 2]),
    );
    let mut out = ColumnVector::new(ColumnType::String, 5);
    let mut define = vec![0u8; 5];
    let mut repeat = vec![0u8; 5];
    reader.read(5, &mut define, &mut repeat, &mut out, 0).unwrap();
    let got: Vec<&str> = (0..5).map(|i| out.str_at(i)).collect();
    assert_eq!(got, vec!["blue", "red", "red", "green", "blue"]);
}

#[test]
fn test_dictionary_index_out_of_range() {
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::ByteArray, 0, 0),
        ColumnType::String,
        2,
        CompressionCodec::Uncompressed,
        string_dict_pages(&["only"], &[0, 3]),
    );
    let mut out = ColumnVector::new(ColumnType::String, 2);
    let mut define = vec![0u8; 2];
    let mut repeat = vec![0u8; 2];
    let err = reader
        .read(2, &mut define, &mut repeat, &mut out, 0)
        .unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_invalid_utf8_does_not_poison_other_columns() {
    let mut bad_body = Vec::new();
    bad_body.extend_from_slice(&2u32.to_le_bytes());
    bad_body.extend_from_slice(&[0xff, 0xfe]);
    let mut bad = leaf_reader(
        ColumnDescriptor::new(PhysicalType::ByteArray, 0, 0),
        ColumnType::String,
        1,
        CompressionCodec::Uncompressed,
        vec![v1_page(1, PageEncoding::Plain, bad_body, CompressionCodec::Uncompressed)],
    );
    let good_body: Vec<u8> = (0i32..4).flat_map(|v| v.to_le_bytes()).collect();
    let mut good = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 0, 0),
        ColumnType::Int32,
        4,
        CompressionCodec::Uncompressed,
        vec![v1_page(4, PageEncoding::Plain, good_body, CompressionCodec::Uncompressed)],
    );

    let mut out = ColumnVector::new(ColumnType::String, 1);
    let mut define = vec![0u8; 4];
    let mut repeat = vec![0u8; 4];
    assert!(bad.read(1, &mut define, &mut repeat, &mut out, 0).is_err());

    let mut out = ColumnVector::new(ColumnType::Int32, 4);
    good.read(4, &mut define, &mut repeat, &mut out, 0).unwrap();
    assert_eq!(out.value::<i32>(3), 3);
}

#[test]
fn test_gzip_compressed_page() {
    let body: Vec<u8> = (0i32..256).flat_map(|v| v.to_le_bytes()).collect();
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 0, 0),
        ColumnType::Int32,
        256,
        CompressionCodec::Gzip,
        vec![v1_page(256, PageEncoding::Plain, body, CompressionCodec::Gzip)],
    );
    let mut out = ColumnVector::new(ColumnType::Int32, 256);
    let mut define = vec![0u8; 256];
    let mut repeat = vec![0u8; 256];
    reader.read(256, &mut define, &mut repeat, &mut out, 0).unwrap();
    assert_eq!(out.value::<i32>(255), 255);
}

#[test]
fn test_v2_page_levels_stay_uncompressed() {
    let defines = [1u8, 1, 0, 1];
    let def_bytes = rle_encode(&defines, 1);
    let values: Vec<u8> = [7i32, 8, 9].iter().flat_map(|v| v.to_le_bytes()).collect();
    let compressed_values = zstd::bulk::compress(&values, 1).unwrap();

    let mut body = def_bytes.clone();
    body.extend_from_slice(&compressed_values);
    let header = PageHeader {
        page_type: PageType::DataPageV2,
        uncompressed_page_size: (def_bytes.len() + values.len()) as u64,
        compressed_page_size: body.len() as u64,
        data_header: None,
        data_header_v2: Some(DataPageHeaderV2 {
            num_values: 4,
            num_nulls: 1,
            num_rows: 4,
            encoding: PageEncoding::Plain,
            definition_levels_byte_length: def_bytes.len() as u32,
            repetition_levels_byte_length: 0,
            is_compressed: true,
        }),
        dictionary_header: None,
    };

    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 1, 0),
        ColumnType::Int32,
        4,
        CompressionCodec::Zstd,
        vec![(header, body)],
    );
    let mut out = ColumnVector::new(ColumnType::Int32, 4);
    let mut define = vec![0u8; 4];
    let mut repeat = vec![0u8; 4];
    reader.read(4, &mut define, &mut repeat, &mut out, 0).unwrap();
    assert_eq!(out.value::<i32>(0), 7);
    assert_eq!(out.value::<i32>(1), 8);
    assert!(out.is_null(2));
    assert_eq!(out.value::<i32>(3), 9);
}

#[test]
fn test_timestamp_millis_converted_type() {
    let values: Vec<u8> = [1_000i64, 2_000]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let desc = ColumnDescriptor::new(PhysicalType::Int64, 0, 0)
        .with_converted_type(ConvertedType::TimestampMillis);
    let mut reader = leaf_reader(
        desc,
        ColumnType::Timestamp,
        2,
        CompressionCodec::Uncompressed,
        vec![v1_page(2, PageEncoding::Plain, values, CompressionCodec::Uncompressed)],
    );
    let mut out = ColumnVector::new(ColumnType::Timestamp, 2);
    let mut define = vec![0u8; 2];
    let mut repeat = vec![0u8; 2];
    reader.read(2, &mut define, &mut repeat, &mut out, 0).unwrap();
    assert_eq!(out.value::<i64>(0), 1_000_000);
    assert_eq!(out.value::<i64>(1), 2_000_000);
}

#[test]
fn test_timestamp_nanos_logical_type() {
    let values: Vec<u8> = 1_500_000i64.to_le_bytes().to_vec();
    let desc = ColumnDescriptor::new(PhysicalType::Int64, 0, 0)
        .with_logical_timestamp(TimestampUnit::Nanos);
    let mut reader = leaf_reader(
        desc,
        ColumnType::Timestamp,
        1,
        CompressionCodec::Uncompressed,
        vec![v1_page(1, PageEncoding::Plain, values, CompressionCodec::Uncompressed)],
    );
    let mut out = ColumnVector::new(ColumnType::Timestamp, 1);
    let mut define = vec![0u8; 1];
    let mut repeat = vec![0u8; 1];
    reader.read(1, &mut define, &mut repeat, &mut out, 0).unwrap();
    assert_eq!(out.value::<i64>(0), 1_500);
}

#[test]
fn test_delta_binary_packed_page() {
    // Header: block 128, 4 miniblocks, 5 values, first value 100.
    let mut body = Vec::new();
    push_uleb(&mut body, 128);
    push_uleb(&mut body, 4);
    push_uleb(&mut body, 5);
    push_uleb(&mut body, (100i64 << 1) as u64); // zig-zag of +100
    // One block: min_delta 1, all miniblock widths 0 (every delta equals 1).
    push_uleb(&mut body, (1i64 << 1) as u64);
    body.extend_from_slice(&[0, 0, 0, 0]);
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int64, 0, 0),
        ColumnType::Int64,
        5,
        CompressionCodec::Uncompressed,
        vec![v1_page(
            5,
            PageEncoding::DeltaBinaryPacked,
            body,
            CompressionCodec::Uncompressed,
        )],
    );
    let mut out = ColumnVector::new(ColumnType::Int64, 5);
    let mut define = vec![0u8; 5];
    let mut repeat = vec![0u8; 5];
    reader.read(5, &mut define, &mut repeat, &mut out, 0).unwrap();
    let got: Vec<i64> = (0..5).map(|i| out.value::<i64>(i)).collect();
    assert_eq!(got, vec![100, 101, 102, 103, 104]);
}

#[test]
fn test_skip_zero_is_idempotent_and_skip_advances() {
    let body: Vec<u8> = (0i32..10).flat_map(|v| v.to_le_bytes()).collect();
    let make = || {
        leaf_reader(
            ColumnDescriptor::new(PhysicalType::Int32, 0, 0),
            ColumnType::Int32,
            10,
            CompressionCodec::Uncompressed,
            vec![v1_page(10, PageEncoding::Plain, body.clone(), CompressionCodec::Uncompressed)],
        )
    };

    let mut define = vec![0u8; 10];
    let mut repeat = vec![0u8; 10];

    let mut with_skip = make();
    let mut out_a = ColumnVector::new(ColumnType::Int32, 10);
    with_skip.read(3, &mut define, &mut repeat, &mut out_a, 0).unwrap();
    with_skip.skip(0).unwrap();
    with_skip.read(3, &mut define, &mut repeat, &mut out_a, 3).unwrap();

    let mut direct = make();
    let mut out_b = ColumnVector::new(ColumnType::Int32, 10);
    direct.read(6, &mut define, &mut repeat, &mut out_b, 0).unwrap();
    for i in 0..6 {
        assert_eq!(out_a.value::<i32>(i), out_b.value::<i32>(i));
    }

    let mut skipped = make();
    let mut out_c = ColumnVector::new(ColumnType::Int32, 4);
    skipped.skip(6).unwrap();
    skipped.read(4, &mut define, &mut repeat, &mut out_c, 0).unwrap();
    assert_eq!(out_c.value::<i32>(0), 6);
    assert_eq!(out_c.value::<i32>(3), 9);
}

#[test]
fn test_chunk_exhausted_is_an_error() {
    let body: Vec<u8> = (0i32..3).flat_map(|v| v.to_le_bytes()).collect();
    let mut reader = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 0, 0),
        ColumnType::Int32,
        3,
        CompressionCodec::Uncompressed,
        vec![v1_page(3, PageEncoding::Plain, body, CompressionCodec::Uncompressed)],
    );
    let mut out = ColumnVector::new(ColumnType::Int32, 5);
    let mut define = vec![0u8; 5];
    let mut repeat = vec![0u8; 5];
    let err = reader
        .read(5, &mut define, &mut repeat, &mut out, 0)
        .unwrap_err();
    assert!(err.to_string().contains("exhausted"));
}

/// Optional list of optional int32: leaf levels are max_define 3 and
/// max_repeat 1, the list node sits at define level 2.
fn list_of_int32(defines: &[u8], repeats: &[u8], present: &[i32]) -> AnyColumnReader {
    let mut body = level_section(repeats, 1);
    body.extend_from_slice(&level_section(defines, 2));
    body.extend(present.iter().flat_map(|v| v.to_le_bytes()));
    // The V1 layout puts repetition levels before definition levels.
    let leaf = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 3, 1),
        ColumnType::Int32,
        defines.len() as u64,
        CompressionCodec::Uncompressed,
        vec![v1_page(
            defines.len() as u64,
            PageEncoding::Plain,
            body,
            CompressionCodec::Uncompressed,
        )],
    );
    AnyColumnReader::List(Box::new(
        ListReader::new(
            ColumnType::List(Box::new(ColumnType::Int32)),
            AnyColumnReader::Leaf(leaf),
            2,
            1,
        )
        .unwrap(),
    ))
}

#[test]
fn test_list_assembly_with_empty_and_null_rows() {
    // Rows: [1, 2], [], NULL, [NULL, 5]
    let mut reader = list_of_int32(
        &[3, 3, 1, 0, 2, 3],
        &[0, 1, 0, 0, 0, 1],
        &[1, 2, 5],
    );
    let list_type = ColumnType::List(Box::new(ColumnType::Int32));
    let mut out = ColumnVector::new(list_type, 4);
    let mut define = vec![0u8; 4];
    let mut repeat = vec![0u8; 4];
    let rows = reader.read(4, &mut define, &mut repeat, &mut out, 0).unwrap();
    assert_eq!(rows, 4);

    let row0 = out.list_entry(0);
    assert_eq!((row0.offset, row0.len), (0, 2));
    assert_eq!(out.child().value::<i32>(0), 1);
    assert_eq!(out.child().value::<i32>(1), 2);

    assert_eq!(out.list_entry(1).len, 0);
    assert!(!out.is_null(1), "empty list is present");

    assert!(out.is_null(2), "define 0 is a null list");

    let row3 = out.list_entry(3);
    assert_eq!(row3.len, 2);
    assert!(out.child().is_null(row3.offset as usize));
    assert_eq!(out.child().value::<i32>(row3.offset as usize + 1), 5);
}

#[test]
fn test_list_rows_split_across_reads() {
    let mut reader = list_of_int32(
        &[3, 3, 1, 0, 2, 3],
        &[0, 1, 0, 0, 0, 1],
        &[1, 2, 5],
    );
    let list_type = ColumnType::List(Box::new(ColumnType::Int32));
    let mut out = ColumnVector::new(list_type.clone(), 2);
    let mut define = vec![0u8; 2];
    let mut repeat = vec![0u8; 2];
    assert_eq!(reader.read(2, &mut define, &mut repeat, &mut out, 0).unwrap(), 2);
    assert_eq!(out.list_entry(0).len, 2);
    assert_eq!(out.list_entry(1).len, 0);

    let mut out = ColumnVector::new(list_type, 2);
    assert_eq!(reader.read(2, &mut define, &mut repeat, &mut out, 0).unwrap(), 2);
    assert!(out.is_null(0));
    assert_eq!(out.list_entry(1).len, 2);
}

/// Optional struct of (optional int32, optional string): struct node at
/// define level 1, leaves at define level 2.
fn struct_reader(rows: usize, defines: &[u8], ints: &[i32], strings: &[&str]) -> AnyColumnReader {
    let mut int_body = level_section(defines, 2);
    int_body.extend(ints.iter().flat_map(|v| v.to_le_bytes()));
    let int_leaf = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 2, 0),
        ColumnType::Int32,
        rows as u64,
        CompressionCodec::Uncompressed,
        vec![v1_page(
            rows as u64,
            PageEncoding::Plain,
            int_body,
            CompressionCodec::Uncompressed,
        )],
    );
    let mut str_body = level_section(defines, 2);
    for s in strings {
        str_body.extend_from_slice(&(s.len() as u32).to_le_bytes());
        str_body.extend_from_slice(s.as_bytes());
    }
    let str_leaf = leaf_reader(
        ColumnDescriptor::new(PhysicalType::ByteArray, 2, 0),
        ColumnType::String,
        rows as u64,
        CompressionCodec::Uncompressed,
        vec![v1_page(
            rows as u64,
            PageEncoding::Plain,
            str_body,
            CompressionCodec::Uncompressed,
        )],
    );
    let fields = vec![
        StructField::new("count", ColumnType::Int32),
        StructField::new("name", ColumnType::String),
    ];
    AnyColumnReader::Struct(
        StructReader::new(
            ColumnType::Struct(fields),
            vec![
                AnyColumnReader::Leaf(int_leaf),
                AnyColumnReader::Leaf(str_leaf),
            ],
            1,
        )
        .unwrap(),
    )
}

#[test]
fn test_struct_read_with_null_rows() {
    let mut reader = struct_reader(3, &[2, 0, 2], &[5, 6], &["a", "b"]);
    let struct_type = ColumnType::Struct(vec![
        StructField::new("count", ColumnType::Int32),
        StructField::new("name", ColumnType::String),
    ]);
    let mut out = ColumnVector::new(struct_type, 3);
    let mut define = vec![0u8; 3];
    let mut repeat = vec![0u8; 3];
    assert_eq!(reader.read(3, &mut define, &mut repeat, &mut out, 0).unwrap(), 3);
    assert!(!out.is_null(0));
    assert!(out.is_null(1), "define 0 nulls the whole struct row");
    assert_eq!(out.struct_child(0).value::<i32>(0), 5);
    assert_eq!(out.struct_child(1).str_at(2), "b");
}

#[test]
fn test_struct_child_row_count_mismatch() {
    // The int child has 3 rows; the list child runs dry after 2 rows.
    let int_body: Vec<u8> = (0i32..3).flat_map(|v| v.to_le_bytes()).collect();
    let int_leaf = leaf_reader(
        ColumnDescriptor::new(PhysicalType::Int32, 0, 0),
        ColumnType::Int32,
        3,
        CompressionCodec::Uncompressed,
        vec![v1_page(3, PageEncoding::Plain, int_body, CompressionCodec::Uncompressed)],
    );
    let list_child = list_of_int32(&[3, 3], &[0, 0], &[1, 2]);
    let fields = vec![
        StructField::new("id", ColumnType::Int32),
        StructField::new("tags", ColumnType::List(Box::new(ColumnType::Int32))),
    ];
    let struct_type = ColumnType::Struct(fields);
    let mut reader = AnyColumnReader::Struct(
        StructReader::new(
            struct_type.clone(),
            vec![AnyColumnReader::Leaf(int_leaf), list_child],
            0,
        )
        .unwrap(),
    );
    let mut out = ColumnVector::new(struct_type, 3);
    let mut define = vec![0u8; 3];
    let mut repeat = vec![0u8; 3];
    let err = reader
        .read(3, &mut define, &mut repeat, &mut out, 0)
        .unwrap_err();
    assert!(err.to_string().contains("row counts"));
}
