//! Embedded PE (Portable Executable) files (spec.md §4.4 "PE file (detector)").
//!
//! The spec treats full PE parsing as an external collaborator ("given a
//! buffer, return a valid PE size or 0"); [`pe_size`] is that contract,
//! implemented as a minimal section-table walk rather than a pulled-in
//! library, since nothing in the corpus carries a PE-parsing crate.

use crate::node::Node;

const E_LFANEW_OFFSET: usize = 0x3c;
const COFF_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;

fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Given a buffer starting at an `MZ` header, return the size of the PE
/// image (the highest `PointerToRawData + SizeOfRawData` across sections),
/// or `0` if the buffer is not a parseable PE file.
fn pe_size(data: &[u8]) -> usize {
    let Some(e_lfanew) = read_u32_le(data, E_LFANEW_OFFSET) else { return 0 };
    let pe_offset = e_lfanew as usize;
    if data.get(pe_offset..pe_offset + 4) != Some(b"PE\0\0") {
        return 0;
    }
    let coff_offset = pe_offset + 4;
    let Some(num_sections) = read_u16_le(data, coff_offset + 2) else { return 0 };
    let Some(optional_header_size) = read_u16_le(data, coff_offset + 16) else { return 0 };
    let section_table_offset = coff_offset + COFF_HEADER_SIZE + optional_header_size as usize;

    let mut max_end = 0u32;
    for i in 0..num_sections as usize {
        let header_offset = section_table_offset + i * SECTION_HEADER_SIZE;
        let Some(size_of_raw_data) = read_u32_le(data, header_offset + 16) else { return max_end as usize };
        let Some(pointer_to_raw_data) = read_u32_le(data, header_offset + 20) else { return max_end as usize };
        max_end = max_end.max(pointer_to_raw_data.saturating_add(size_of_raw_data));
    }
    max_end as usize
}

/// Find embedded PE files, delimited by their computed section-table extent.
pub fn find_pe_files(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut search_from = 0;
    while let Some(relative) = data[search_from..].windows(2).position(|w| w == b"MZ") {
        let mz_offset = search_from + relative;
        search_from = mz_offset + 1;
        if data.len() < mz_offset + E_LFANEW_OFFSET + 4 {
            continue;
        }
        let size = pe_size(&data[mz_offset..]);
        if size == 0 {
            continue;
        }
        let end = (mz_offset + size).min(data.len());
        out.push(Node::new("pe_file", data[mz_offset..end].to_vec()).with_span(mz_offset, end));
    }
    out
}
