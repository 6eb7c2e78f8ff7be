//! Catalogue of the functions the lint knows about.
//!
//! Lookups are case-insensitive and ignore the `_xlfn.`/`_xlws.` prefixes that
//! newer functions carry in stored workbooks. A name missing from the catalogue
//! is an unknown function.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use sheetaudit_common::ArgKind;

bitflags::bitflags! {
    /// Properties of a function that matter to static analysis.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct FnCaps: u8 {
        /// Re-evaluated on every recalculation (`NOW()`, `RAND()`, `INDIRECT()`).
        const VOLATILE = 0b0000_0001;
        /// Searches a table for a key (`VLOOKUP`, `MATCH`).
        const LOOKUP   = 0b0000_0010;
        /// The second argument is a divisor (`MOD`, `QUOTIENT`).
        const DIVISION = 0b0000_0100;
    }
}

/// Signature of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
    /// Expected kind per parameter; the last entry repeats for variadic tails.
    pub params: &'static [ArgKind],
    pub caps: FnCaps,
}

impl FunctionSpec {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    pub fn arg_kind(&self, index: usize) -> ArgKind {
        self.params
            .get(index)
            .or_else(|| self.params.last())
            .copied()
            .unwrap_or(ArgKind::Any)
    }

    pub fn is_volatile(&self) -> bool {
        self.caps.contains(FnCaps::VOLATILE)
    }

    pub fn is_lookup(&self) -> bool {
        self.caps.contains(FnCaps::LOOKUP)
    }

    pub fn is_division(&self) -> bool {
        self.caps.contains(FnCaps::DIVISION)
    }
}

use ArgKind::{Any, Logical, Number, Range, Text};

const NONE: FnCaps = FnCaps::empty();
const VOLATILE: FnCaps = FnCaps::VOLATILE;
const LOOKUP: FnCaps = FnCaps::LOOKUP;
const DIVISION: FnCaps = FnCaps::DIVISION;

#[rustfmt::skip]
static SPECS: &[(&str, usize, Option<usize>, &[ArgKind], FnCaps)] = &[
    // math & aggregation
    ("SUM", 1, None, &[Number], NONE),
    ("AVERAGE", 1, None, &[Number], NONE),
    ("MIN", 1, None, &[Number], NONE),
    ("MAX", 1, None, &[Number], NONE),
    ("COUNT", 1, None, &[Any], NONE),
    ("COUNTA", 1, None, &[Any], NONE),
    ("COUNTBLANK", 1, Some(1), &[Range], NONE),
    ("PRODUCT", 1, None, &[Number], NONE),
    ("ABS", 1, Some(1), &[Number], NONE),
    ("ROUND", 2, Some(2), &[Number, Number], NONE),
    ("ROUNDUP", 2, Some(2), &[Number, Number], NONE),
    ("ROUNDDOWN", 2, Some(2), &[Number, Number], NONE),
    ("INT", 1, Some(1), &[Number], NONE),
    ("MOD", 2, Some(2), &[Number, Number], DIVISION),
    ("QUOTIENT", 2, Some(2), &[Number, Number], DIVISION),
    ("POWER", 2, Some(2), &[Number, Number], NONE),
    ("SQRT", 1, Some(1), &[Number], NONE),
    ("EXP", 1, Some(1), &[Number], NONE),
    ("LN", 1, Some(1), &[Number], NONE),
    ("LOG", 1, Some(2), &[Number, Number], NONE),
    ("LOG10", 1, Some(1), &[Number], NONE),
    ("PI", 0, Some(0), &[], NONE),
    ("SIGN", 1, Some(1), &[Number], NONE),
    ("CEILING", 1, Some(2), &[Number, Number], NONE),
    ("FLOOR", 1, Some(2), &[Number, Number], NONE),
    ("SUMIF", 2, Some(3), &[Range, Any, Range], NONE),
    ("SUMIFS", 3, None, &[Range, Range, Any], NONE),
    ("COUNTIF", 2, Some(2), &[Range, Any], NONE),
    ("COUNTIFS", 2, None, &[Range, Any], NONE),
    ("AVERAGEIF", 2, Some(3), &[Range, Any, Range], NONE),
    ("SUMPRODUCT", 1, None, &[Range], NONE),
    ("MEDIAN", 1, None, &[Number], NONE),
    ("STDEV", 1, None, &[Number], NONE),
    ("STDEV.S", 1, None, &[Number], NONE),
    ("VAR", 1, None, &[Number], NONE),
    ("LARGE", 2, Some(2), &[Range, Number], NONE),
    ("SMALL", 2, Some(2), &[Range, Number], NONE),
    ("RANK", 2, Some(3), &[Number, Range, Number], NONE),
    ("RAND", 0, Some(0), &[], VOLATILE),
    ("RANDBETWEEN", 2, Some(2), &[Number, Number], VOLATILE),
    // logical
    ("IF", 1, Some(3), &[Logical, Any, Any], NONE),
    ("IFS", 2, None, &[Logical, Any], NONE),
    ("AND", 1, None, &[Logical], NONE),
    ("OR", 1, None, &[Logical], NONE),
    ("XOR", 1, None, &[Logical], NONE),
    ("NOT", 1, Some(1), &[Logical], NONE),
    ("IFERROR", 2, Some(2), &[Any, Any], NONE),
    ("IFNA", 2, Some(2), &[Any, Any], NONE),
    ("TRUE", 0, Some(0), &[], NONE),
    ("FALSE", 0, Some(0), &[], NONE),
    // text
    ("CONCATENATE", 1, None, &[Text], NONE),
    ("CONCAT", 1, None, &[Text], NONE),
    ("TEXTJOIN", 3, None, &[Text, Logical, Any], NONE),
    ("LEFT", 1, Some(2), &[Text, Number], NONE),
    ("RIGHT", 1, Some(2), &[Text, Number], NONE),
    ("MID", 3, Some(3), &[Text, Number, Number], NONE),
    ("LEN", 1, Some(1), &[Text], NONE),
    ("UPPER", 1, Some(1), &[Text], NONE),
    ("LOWER", 1, Some(1), &[Text], NONE),
    ("PROPER", 1, Some(1), &[Text], NONE),
    ("TRIM", 1, Some(1), &[Text], NONE),
    ("SUBSTITUTE", 3, Some(4), &[Text, Text, Text, Number], NONE),
    ("FIND", 2, Some(3), &[Text, Text, Number], NONE),
    ("SEARCH", 2, Some(3), &[Text, Text, Number], NONE),
    ("TEXT", 2, Some(2), &[Any, Text], NONE),
    ("VALUE", 1, Some(1), &[Text], NONE),
    ("REPT", 2, Some(2), &[Text, Number], NONE),
    ("EXACT", 2, Some(2), &[Text, Text], NONE),
    // date & time
    ("NOW", 0, Some(0), &[], VOLATILE),
    ("TODAY", 0, Some(0), &[], VOLATILE),
    ("DATE", 3, Some(3), &[Number, Number, Number], NONE),
    ("YEAR", 1, Some(1), &[Any], NONE),
    ("MONTH", 1, Some(1), &[Any], NONE),
    ("DAY", 1, Some(1), &[Any], NONE),
    ("HOUR", 1, Some(1), &[Any], NONE),
    ("MINUTE", 1, Some(1), &[Any], NONE),
    ("SECOND", 1, Some(1), &[Any], NONE),
    ("WEEKDAY", 1, Some(2), &[Any, Number], NONE),
    ("EDATE", 2, Some(2), &[Any, Number], NONE),
    ("EOMONTH", 2, Some(2), &[Any, Number], NONE),
    ("DATEDIF", 3, Some(3), &[Any, Any, Text], NONE),
    ("DATEVALUE", 1, Some(1), &[Text], NONE),
    ("NETWORKDAYS", 2, Some(3), &[Any, Any, Range], NONE),
    // lookup & reference
    ("VLOOKUP", 3, Some(4), &[Any, Range, Number, Logical], LOOKUP),
    ("HLOOKUP", 3, Some(4), &[Any, Range, Number, Logical], LOOKUP),
    ("MATCH", 2, Some(3), &[Any, Range, Number], LOOKUP),
    ("XLOOKUP", 3, Some(6), &[Any, Range, Range, Any, Number, Number], LOOKUP),
    ("LOOKUP", 2, Some(3), &[Any, Range, Range], LOOKUP),
    ("INDEX", 2, Some(4), &[Range, Number, Number, Number], NONE),
    ("INDIRECT", 1, Some(2), &[Text, Logical], VOLATILE),
    ("OFFSET", 3, Some(5), &[Range, Number, Number, Number, Number], VOLATILE),
    ("ROW", 0, Some(1), &[Range], NONE),
    ("COLUMN", 0, Some(1), &[Range], NONE),
    ("ROWS", 1, Some(1), &[Range], NONE),
    ("COLUMNS", 1, Some(1), &[Range], NONE),
    ("CHOOSE", 2, None, &[Number, Any], NONE),
    // information
    ("ISBLANK", 1, Some(1), &[Any], NONE),
    ("ISERROR", 1, Some(1), &[Any], NONE),
    ("ISNUMBER", 1, Some(1), &[Any], NONE),
    ("ISTEXT", 1, Some(1), &[Any], NONE),
    ("ISNA", 1, Some(1), &[Any], NONE),
    ("NA", 0, Some(0), &[], NONE),
    ("CELL", 1, Some(2), &[Text, Range], VOLATILE),
    // financial
    ("PMT", 3, Some(5), &[Number], NONE),
    ("FV", 3, Some(5), &[Number], NONE),
    ("PV", 3, Some(5), &[Number], NONE),
    ("NPV", 2, None, &[Number], NONE),
];

static CATALOGUE: Lazy<FxHashMap<&'static str, FunctionSpec>> = Lazy::new(|| {
    SPECS
        .iter()
        .map(|&(name, min_args, max_args, params, caps)| {
            (
                name,
                FunctionSpec {
                    name,
                    min_args,
                    max_args,
                    params,
                    caps,
                },
            )
        })
        .collect()
});

/// Upper-case and strip the future-function prefixes.
pub fn canonical_name(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase();
    for prefix in ["_XLFN._XLWS.", "_XLFN.", "_XLWS."] {
        if let Some(rest) = upper.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    upper
}

pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    CATALOGUE.get(canonical_name(name).as_str())
}

pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn is_volatile(name: &str) -> bool {
    lookup(name).is_some_and(FunctionSpec::is_volatile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_prefix_blind() {
        assert_eq!(lookup("sum").map(|s| s.name), Some("SUM"));
        assert_eq!(lookup("_xlfn.XLOOKUP").map(|s| s.name), Some("XLOOKUP"));
        assert!(lookup("INVALID_FUNCTION").is_none());
    }

    #[test]
    fn arity_and_kinds() {
        let round = lookup("ROUND").unwrap();
        assert!(round.accepts(2));
        assert!(!round.accepts(1));
        assert!(lookup("SUM").unwrap().accepts(30));
        assert_eq!(lookup("SUM").unwrap().arg_kind(7), ArgKind::Number);
        assert_eq!(lookup("NOW").unwrap().arg_kind(0), ArgKind::Any);
    }

    #[test]
    fn caps() {
        for name in ["NOW", "TODAY", "RAND", "RANDBETWEEN", "INDIRECT", "OFFSET", "CELL"] {
            assert!(is_volatile(name), "{name}");
        }
        assert!(!is_volatile("SUM"));
        assert!(lookup("VLOOKUP").unwrap().is_lookup());
        assert!(lookup("MOD").unwrap().is_division());
    }
}
