use crate::error::{CorpusResult, invalid_argument};

pub fn chunk_sequence<T: Clone>(items: &[T], size: usize) -> CorpusResult<Vec<Vec<T>>> {
    if size == 0 {
        return Err(invalid_argument("chunk size must be greater than zero"));
    }
    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}

/// Splits `bytes` into parts of at most `max_bytes`, preferring `\n`
/// boundaries. Concatenating the parts yields `bytes` again. Hard cuts of an
/// overlong line land on char boundaries when the input is valid UTF-8.
pub fn split_by_size(bytes: &[u8], max_bytes: usize) -> CorpusResult<Vec<Vec<u8>>> {
    if max_bytes == 0 {
        return Err(invalid_argument("max_bytes must be greater than zero"));
    }

    let utf8 = std::str::from_utf8(bytes).is_ok();
    let mut parts = Vec::new();
    let mut current = Vec::new();
    for line in bytes.split_inclusive(|byte| *byte == b'\n') {
        if current.len() + line.len() <= max_bytes {
            current.extend_from_slice(line);
            continue;
        }

        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        if line.len() <= max_bytes {
            current.extend_from_slice(line);
            continue;
        }

        let mut rest = line;
        while rest.len() > max_bytes {
            let cut = if utf8 {
                floor_char_boundary(rest, max_bytes)
            } else {
                max_bytes
            };
            let (head, tail) = rest.split_at(cut);
            parts.push(head.to_vec());
            rest = tail;
        }
        current.extend_from_slice(rest);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    Ok(parts)
}

fn is_continuation_byte(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

// `bytes` is valid UTF-8 here. A char can be up to 4 bytes; when max_bytes is
// smaller than the first char the whole char still has to go somewhere.
fn floor_char_boundary(bytes: &[u8], index: usize) -> usize {
    let mut cut = index.min(bytes.len());
    while cut > 0 && cut < bytes.len() && is_continuation_byte(bytes[cut]) {
        cut -= 1;
    }
    if cut == 0 {
        cut = 1;
        while cut < bytes.len() && is_continuation_byte(bytes[cut]) {
            cut += 1;
        }
    }
    cut
}

pub fn part_file_name(stem: &str, ext: Option<&str>, index: usize, width: usize) -> String {
    match ext {
        Some(ext) if !ext.is_empty() => {
            format!("{stem}_part{:0width$}.{ext}", index, width = width)
        }
        _ => format!("{stem}_part{:0width$}", index, width = width),
    }
}
