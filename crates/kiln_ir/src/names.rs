//! Names the generators agree on with the runtime libraries.

pub const THIS: &str = "this";
pub const RETURN_VAR: &str = "_ret";
pub const TEMP_PREFIX: &str = "_temp";
pub const SCOPE_PREFIX: &str = "s";

pub const TRUE_FACTORY: &str = "_ofTrue";
pub const FALSE_FACTORY: &str = "_ofFalse";
pub const CONSTRUCTOR: &str = "<init>";
pub const IS_SET: &str = "_isSet";
pub const PROMOTE: &str = "_promote";

pub const RETURN_TRUE_LABEL: &str = "return_true";
pub const RETURN_FALSE_LABEL: &str = "return_false";
pub const SUPER: &str = "super";

/// Converts a `Boolean` object to the primitive truth value branches test.
pub const TRUE_METHOD: &str = "_true";
pub const PRIMITIVE_BOOLEAN: &str = "boolean";

/// Parameter of the binary synthetic operators.
pub const OTHER: &str = "other";

pub const EQ: &str = "_eq";
pub const NEQ: &str = "_neq";
pub const CMP: &str = "_cmp";
pub const HASHCODE: &str = "_hashcode";
pub const FIELD_SET_STATUS: &str = "_fieldSetStatus";
pub const OR: &str = "_or";
pub const MUL: &str = "_mul";
pub const ADD: &str = "_add";

pub const RETURN_UNSET_LABEL: &str = "return_unset";
pub const RETURN_ZERO_LABEL: &str = "return_zero";
pub const RETURN_HASH_LABEL: &str = "return_hash";
pub const CONTINUE_CMP_LABEL: &str = "continue_cmp";
pub const FIELD_SKIP_LABEL: &str = "field_skip";
pub const HASH_SKIP_LABEL: &str = "hash_skip";

/// Multiplier of the polynomial field hash.
pub const HASH_MULTIPLIER: &str = "31";
