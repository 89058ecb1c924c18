use crate::group::SandboxGroup;

/// Decides whether a type name may be serialized or deserialized within a
/// sandbox group.
///
/// Implementations must be pure: the same group and name always give the
/// same answer.
pub trait Whitelist: Send + Sync {
    fn is_permitted(&self, group: &SandboxGroup, type_name: &str) -> bool;
}

/// Permits every type. For tests and fully trusted contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllWhitelist;

impl Whitelist for AllWhitelist {
    fn is_permitted(&self, _group: &SandboxGroup, _type_name: &str) -> bool {
        true
    }
}

impl<W: Whitelist + ?Sized> Whitelist for std::sync::Arc<W> {
    fn is_permitted(&self, group: &SandboxGroup, type_name: &str) -> bool {
        (**self).is_permitted(group, type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_whitelist_permits_anything() {
        let group = SandboxGroup::builder("any").build();
        assert!(AllWhitelist.is_permitted(&group, "com.acme.Anything"));
        assert!(AllWhitelist.is_permitted(&group, ""));
    }
}
