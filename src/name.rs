use crate::util::{NamePtr, StringPtr, TermCtx};

pub(crate) const ANON_HASH: u64 = 1129;
pub(crate) const STR_HASH: u64 = 1151;
pub(crate) const NUM_HASH: u64 = 1153;

/// Hierarchical names, like `HAdd.hAdd` or `_private.0.foo`. Each segment is
/// either a string or a number, prefixed by the rest of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Name {
    Anon,
    Str(NamePtr, StringPtr, u64),
    Num(NamePtr, u64, u64),
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { state.write_u64(self.get_hash()) }
}

impl Name {
    pub fn get_hash(&self) -> u64 {
        match self {
            Name::Anon => ANON_HASH,
            Name::Str(.., hash) | Name::Num(.., hash) => *hash,
        }
    }
}

impl TermCtx {
    pub fn name_prefix(&self, n: NamePtr) -> NamePtr {
        match self.read_name(n) {
            Name::Anon => n,
            Name::Str(pfx, ..) | Name::Num(pfx, ..) => pfx,
        }
    }

    /// The dot-separated rendering of a name, e.g. `Nat.add`.
    pub fn name_to_string(&self, n: NamePtr) -> String {
        match self.read_name(n) {
            Name::Anon => String::new(),
            Name::Str(pfx, sfx, _) => {
                let sfx = self.read_string(sfx);
                if pfx == self.anonymous() {
                    sfx.to_owned()
                } else {
                    format!("{}.{}", self.name_to_string(pfx), sfx)
                }
            }
            Name::Num(pfx, sfx, _) =>
                if pfx == self.anonymous() {
                    format!("{}", sfx)
                } else {
                    format!("{}.{}", self.name_to_string(pfx), sfx)
                },
        }
    }
}
