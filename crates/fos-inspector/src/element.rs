//! Element classification

use serde::Serialize;

/// Element type tag as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ElementType {
    Class = 1,
    Function = 5,
    HostComponent = 7,
    OtherOrUnknown = 9,
    Root = 11,
}

impl ElementType {
    /// Classify a node from what its host reports.
    ///
    /// `None` means the host has no current element for the node.
    pub fn classify(kind: Option<ElementKind>) -> Self {
        match kind {
            Some(ElementKind::Composite { has_instance: true }) => Self::Class,
            Some(ElementKind::Composite { has_instance: false }) => Self::Function,
            Some(ElementKind::Host) => Self::HostComponent,
            Some(ElementKind::Other) | None => Self::OtherOrUnknown,
        }
    }

    /// Wire value
    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ElementType {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Class),
            5 => Ok(Self::Function),
            7 => Ok(Self::HostComponent),
            9 => Ok(Self::OtherOrUnknown),
            11 => Ok(Self::Root),
            other => Err(other),
        }
    }
}

/// Shape of a host node's current element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// User component; `has_instance` when it keeps a public instance
    Composite { has_instance: bool },
    /// Native/host primitive (div, view, ...)
    Host,
    /// Text, empty and anything else
    Other,
}

/// What a host reports about one node's current element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo<N> {
    pub kind: ElementKind,
    pub display_name: Option<String>,
    pub key: Option<String>,
    /// Node that created this element, if tracked
    pub owner: Option<N>,
}

impl<N> ElementInfo<N> {
    pub fn element_type(&self) -> ElementType {
        ElementType::classify(Some(self.kind))
    }
}

/// Source location of an element's definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            ElementType::classify(Some(ElementKind::Composite { has_instance: true })),
            ElementType::Class
        );
        assert_eq!(
            ElementType::classify(Some(ElementKind::Composite { has_instance: false })),
            ElementType::Function
        );
        assert_eq!(ElementType::classify(Some(ElementKind::Host)), ElementType::HostComponent);
        assert_eq!(ElementType::classify(None), ElementType::OtherOrUnknown);
    }

    #[test]
    fn test_wire_values() {
        for ty in [
            ElementType::Class,
            ElementType::Function,
            ElementType::HostComponent,
            ElementType::OtherOrUnknown,
            ElementType::Root,
        ] {
            assert_eq!(ElementType::try_from(ty.as_u32()), Ok(ty));
        }
        assert_eq!(ElementType::try_from(4), Err(4));
    }
}
