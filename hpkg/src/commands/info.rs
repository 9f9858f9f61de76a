use std::path::Path;

use humansize::{file_size_opts as options, FileSize};
use hpkg_format::{HeapHeader, Section};

use super::{open, Container};
use crate::error::Result;

fn size(bytes: u64) -> String {
    bytes
        .file_size(options::CONVENTIONAL)
        .unwrap_or_else(|_| bytes.to_string())
}

fn print_heap(heap: &HeapHeader) {
    println!("Format version:     {}.{}", heap.version, heap.minor_version);
    println!("Header size:        {}", heap.header_size);
    println!("Total size:         {}", size(heap.total_size));
    println!("Heap compression:   {}", heap.compression);
    println!("Heap chunk size:    {}", size(u64::from(heap.chunk_size)));
    println!("Heap compressed:    {}", size(heap.compressed_size));
    println!("Heap uncompressed:  {}", size(heap.uncompressed_size));
}

fn print_section(name: &str, section: Option<Section>) {
    match section {
        Some(s) => println!(
            "{:<20}{} at {:#x}, {} strings in {}",
            format!("{}:", name),
            size(s.length),
            s.offset,
            s.strings_count,
            size(s.strings_length),
        ),
        None => println!("{:<20}<invalid>", format!("{}:", name)),
    }
}

pub fn run(path: &Path) -> Result<()> {
    match open(path)? {
        Container::Package(file) => {
            let header = file.header();
            println!("Package:            {}", path.display());
            print_heap(&header.heap);
            print_section("Table of contents", header.toc_section().ok());
            print_section("Package attributes", header.package_attributes_section().ok());
        }
        Container::Repository(file) => {
            let header = file.header();
            println!("Repository:         {}", path.display());
            print_heap(&header.heap);
            println!("{:<20}{}", "Repository info:", size(u64::from(header.info_length)));
            print_section("Packages", header.packages_section().ok());
        }
    }

    Ok(())
}
