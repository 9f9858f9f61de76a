use std::path::Path;

use hpkg_format::{Attribute, AttributeContext, AttributeIterator, DecodeError};

use super::{open, Container};
use crate::error::{Error, Result};

fn format_attribute(context: &AttributeContext, attr: &Attribute, indent: usize) -> String {
    let value = match attr.value(context) {
        Ok(value) => value.to_string(),
        Err(err) => format!("<error: {}>", err),
    };
    format!(
        "{:indent$}{} : {} : {}",
        "",
        attr.id(),
        attr.attribute_type(),
        value,
        indent = indent
    )
}

fn print_attribute(context: &AttributeContext, attr: &Attribute, indent: usize) {
    println!("{}", format_attribute(context, attr, indent));
    for child in attr.children() {
        print_attribute(context, child, indent + 2);
    }
}

fn dump_all(mut iter: AttributeIterator) -> std::result::Result<(), DecodeError> {
    while iter.has_next() {
        let attr = iter.next_attribute()?;
        print_attribute(iter.context(), &attr, 0);
    }
    match iter.error() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

pub fn run(path: &Path, toc: bool) -> Result<()> {
    let iter = match open(path)? {
        Container::Package(file) if toc => file.toc(),
        Container::Package(file) => file.package_attributes(),
        Container::Repository(file) => {
            if toc {
                tracing::warn!("repositories have no table of contents; dumping packages");
            }
            file.package_attributes()
        }
    };

    dump_all(iter).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}
