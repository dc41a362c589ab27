use std::io::Cursor;

use pretty_assertions::assert_eq;
use qvd_file::{read_qvd, read_qvd_chunks, write_qvd, QvdError, WriteOptions};
use qvd_model::{QvdTable, Value};

fn thousand_rows() -> Vec<u8> {
    let table = QvdTable::from_columns([
        (
            "N".to_string(),
            (0..1000).map(Value::from).collect::<Vec<_>>(),
        ),
        (
            "Bucket".to_string(),
            (0..1000)
                .map(|n| {
                    if n % 10 == 0 {
                        Value::Null
                    } else {
                        Value::String(format!("b{}", n % 7))
                    }
                })
                .collect::<Vec<_>>(),
        ),
    ])
    .unwrap();
    let mut bytes = Vec::new();
    write_qvd(&mut bytes, &table, &WriteOptions::default()).unwrap();
    bytes
}

#[test]
fn chunk_count_is_known_up_front() {
    let bytes = thousand_rows();
    let chunks = read_qvd_chunks(Cursor::new(&bytes), 256).unwrap();
    assert_eq!(chunks.chunk_count(), 4);
    assert_eq!(chunks.len(), 4);
}

#[test]
fn concatenated_chunks_equal_the_whole_read() {
    let bytes = thousand_rows();
    let whole = read_qvd(Cursor::new(&bytes)).unwrap();

    let mut chunks = read_qvd_chunks(Cursor::new(&bytes), 256).unwrap();
    let mut assembled = chunks.next().unwrap().unwrap();
    let mut sizes = vec![assembled.row_count()];
    for chunk in chunks {
        let chunk = chunk.unwrap();
        sizes.push(chunk.row_count());
        assembled.concat_inplace(&chunk).unwrap();
    }

    assert_eq!(sizes, vec![256, 256, 256, 232]);
    assert_eq!(assembled, whole);
}

#[test]
fn chunks_are_self_contained_tables() {
    let bytes = thousand_rows();
    let chunk = read_qvd_chunks(Cursor::new(&bytes), 10)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(chunk.shape(), (10, 2));
    assert_eq!(chunk.get(3, "N").unwrap(), &Value::Integer(3));
    assert!(chunk.get(0, "Bucket").unwrap().is_null());
}

#[test]
fn chunk_size_larger_than_table_yields_one_chunk() {
    let bytes = thousand_rows();
    let mut chunks = read_qvd_chunks(Cursor::new(&bytes), 5000).unwrap();
    assert_eq!(chunks.chunk_count(), 1);
    let only = chunks.next().unwrap().unwrap();
    assert_eq!(only.row_count(), 1000);
    assert!(chunks.next().is_none());
}

#[test]
fn zero_chunk_size_fails_fast() {
    let bytes = thousand_rows();
    assert!(matches!(
        read_qvd_chunks(Cursor::new(&bytes), 0),
        Err(QvdError::InvalidChunkSize)
    ));
}

#[test]
fn exact_size_iterator_counts_down() {
    let bytes = thousand_rows();
    let mut chunks = read_qvd_chunks(Cursor::new(&bytes), 300).unwrap();
    assert_eq!(chunks.len(), 4);
    chunks.next().unwrap().unwrap();
    assert_eq!(chunks.len(), 3);
}
