use super::{Pkg, PkgFactory};
use crate::context::AttributeContext;
use crate::error::PkgError;
use crate::iter::AttributeIterator;

/// One [`Pkg`] per root attribute of a stream, as in the package list of an
/// `.hpkr` repository.
#[derive(Debug)]
pub struct PkgIterator {
    attributes: AttributeIterator,
    factory: PkgFactory,
}

impl PkgIterator {
    pub fn new(attributes: AttributeIterator) -> PkgIterator {
        PkgIterator {
            attributes,
            factory: PkgFactory::new(),
        }
    }

    #[inline(always)]
    pub fn has_next(&self) -> bool {
        self.attributes.has_next()
    }

    #[inline(always)]
    pub fn context(&self) -> &AttributeContext {
        self.attributes.context()
    }

    /// # Panics
    ///
    /// If the underlying attribute iterator is exhausted.
    pub fn next_pkg(&mut self) -> Result<Pkg, PkgError> {
        let attribute = self.attributes.next_attribute()?;
        Ok(self
            .factory
            .create_package(self.attributes.context(), &attribute)?)
    }
}

impl Iterator for PkgIterator {
    type Item = Result<Pkg, PkgError>;

    fn next(&mut self) -> Option<Self::Item> {
        let attribute = match self.attributes.next()? {
            Ok(attribute) => attribute,
            Err(err) => return Some(Err(err.into())),
        };

        Some(
            self.factory
                .create_package(self.attributes.context(), &attribute)
                .map_err(PkgError::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttributeValue, StringValue};
    use crate::id::AttributeId;
    use crate::strings::StringTable;
    use crate::test_support::StreamBuilder;

    #[test]
    fn one_pkg_per_root() {
        let mut b = StreamBuilder::new();
        for (name, version) in &[("alpha", "1"), ("beta", "2")] {
            b.attr(
                AttributeId::Package,
                AttributeValue::String(StringValue::Inline((*name).into())),
                true,
            )
            .string(AttributeId::PackageVersionMajor, version)
            .end();
        }
        b.end();

        let ctx = AttributeContext::in_memory(b.build(), StringTable::default());
        let pkgs: Vec<_> = PkgIterator::new(AttributeIterator::new(ctx, 0))
            .collect::<Result<_, _>>()
            .unwrap();

        let names: Vec<_> = pkgs.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["alpha-1", "beta-2"]);
    }

    #[test]
    fn decode_errors_surface() {
        let ctx = AttributeContext::in_memory(vec![0x80], StringTable::default());
        let mut iter = PkgIterator::new(AttributeIterator::new(ctx, 0));
        assert!(!iter.has_next());
        assert!(matches!(iter.next(), Some(Err(PkgError::Decode(_)))));
        assert!(iter.next().is_none());
    }
}
