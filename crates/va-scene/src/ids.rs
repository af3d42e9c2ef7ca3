//! Small-integer entity identities for the scene graph (§3).

macro_rules! small_int_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub i32);

        impl $name {
            pub const INVALID: Self = Self(-1);

            pub fn is_valid(self) -> bool {
                self.0 >= 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

small_int_id!(SoundSourceId);
small_int_id!(ReceiverId);
small_int_id!(PortalId);
</content>
