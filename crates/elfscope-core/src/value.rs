//! Constant-domain machinery.
//!
//! Every ELF constant space (class, encoding, OS ABI, machine, section
//! type, symbol binding/type/visibility, dynamic tag, ...) is a closed set
//! of (numeric value, mnemonic, description) triples. [`elf_values!`]
//! declares one such domain as a plain enum backed by static tables, with
//! numeric lookup, reverse mnemonic lookup, and a description-printing
//! `Display`.
//!
//! Domains that additionally tolerate reserved ranges (OS-specific,
//! processor-specific, application-specific) wrap their enum in a
//! domain-local kind type; [`range_desc`] formats the placeholder
//! description for values inside such a range.

/// Declare a constant domain as an enum plus its lookup tables.
macro_rules! elf_values {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($repr:ty) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $val:expr, $mnemonic:expr, $desc:expr;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every value defined in this domain.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Exact numeric lookup; `None` for anything not in the table.
            pub fn from_raw(raw: $repr) -> Option<Self> {
                match raw {
                    $( x if x == $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Numeric value of this entry.
            pub const fn raw(self) -> $repr {
                match self {
                    $( Self::$variant => $val, )+
                }
            }

            /// Format-documentation mnemonic of this entry.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Self::$variant => $mnemonic, )+
                }
            }

            /// Human-readable description of this entry.
            pub const fn desc(self) -> &'static str {
                match self {
                    $( Self::$variant => $desc, )+
                }
            }

            /// Case-insensitive reverse lookup by mnemonic.
            pub fn from_mnemonic(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.mnemonic().eq_ignore_ascii_case(name))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.desc())
            }
        }
    };
}

pub(crate) use elf_values;

/// Placeholder description for a known-valid value inside a reserved
/// range: `BASE+hexoffset`, e.g. `SHT_LOOS+0000005`.
pub fn range_desc(base_name: &str, value: u64, base: u64) -> String {
    format!("{base_name}+{:07x}", value - base)
}

#[cfg(test)]
mod tests {
    use super::*;

    elf_values! {
        /// Toy domain for the macro itself.
        enum Sample(u16) {
            Alpha = 1, "ALPHA", "first thing";
            Beta = 2, "BETA", "second thing";
            Gamma = 0x100, "GAMMA", "third thing";
        }
    }

    #[test]
    fn test_numeric_lookup() {
        assert_eq!(Sample::from_raw(1), Some(Sample::Alpha));
        assert_eq!(Sample::from_raw(0x100), Some(Sample::Gamma));
        assert_eq!(Sample::from_raw(3), None);
        assert_eq!(Sample::Beta.raw(), 2);
    }

    #[test]
    fn test_mnemonic_lookup_is_case_insensitive() {
        assert_eq!(Sample::from_mnemonic("beta"), Some(Sample::Beta));
        assert_eq!(Sample::from_mnemonic("GaMmA"), Some(Sample::Gamma));
        assert_eq!(Sample::from_mnemonic("delta"), None);
    }

    #[test]
    fn test_display_prints_description() {
        assert_eq!(Sample::Alpha.to_string(), "first thing");
    }

    #[test]
    fn test_range_desc_format() {
        assert_eq!(range_desc("SHT_LOOS", 0x6000_0005, 0x6000_0000), "SHT_LOOS+0000005");
        assert_eq!(range_desc("SHT_LOOS", 0x6fff_fff1, 0x6000_0000), "SHT_LOOS+ffffff1");
    }
}
