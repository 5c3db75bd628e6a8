//! Instruction classification against the CPython 3.11 opcode families
//!
//! An instruction is scored as one of three execution-quality classes:
//! specialized (the interpreter substituted a type-specialized variant),
//! adaptive (the still-probing placeholder form of a specializable
//! operation), or unquickened (generic slow path). Classification is a
//! static table lookup over the known 3.11 opcode families, built once at
//! startup — no substring matching on opcode names at query time.

use std::collections::{HashMap, HashSet};

use crate::records::InstructionRecord;
use crate::stats::Stats;

/// Category tag for one specializable-family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeCategory {
    /// A `*_ADAPTIVE` placeholder still collecting type feedback.
    Adaptive,
    /// A successfully specialized (or quickened) variant, including the
    /// fused superinstructions.
    Specialized,
}

/// The `*_ADAPTIVE` placeholder forms, one per specializable family.
const ADAPTIVE_INSTRUCTIONS: &[&str] = &[
    "BINARY_OP_ADAPTIVE",
    "BINARY_SUBSCR_ADAPTIVE",
    "CALL_ADAPTIVE",
    "COMPARE_OP_ADAPTIVE",
    "LOAD_ATTR_ADAPTIVE",
    "LOAD_GLOBAL_ADAPTIVE",
    "LOAD_METHOD_ADAPTIVE",
    "PRECALL_ADAPTIVE",
    "STORE_ATTR_ADAPTIVE",
    "STORE_SUBSCR_ADAPTIVE",
    "UNPACK_SEQUENCE_ADAPTIVE",
];

/// Every non-adaptive member of `opcode._specializations` in CPython 3.11,
/// including the quickened `*_QUICK` forms and the fused superinstructions.
const SPECIALIZED_INSTRUCTIONS: &[&str] = &[
    // BINARY_OP
    "BINARY_OP_ADD_FLOAT",
    "BINARY_OP_ADD_INT",
    "BINARY_OP_ADD_UNICODE",
    "BINARY_OP_INPLACE_ADD_UNICODE",
    "BINARY_OP_MULTIPLY_FLOAT",
    "BINARY_OP_MULTIPLY_INT",
    "BINARY_OP_SUBTRACT_FLOAT",
    "BINARY_OP_SUBTRACT_INT",
    // BINARY_SUBSCR
    "BINARY_SUBSCR_DICT",
    "BINARY_SUBSCR_GETITEM",
    "BINARY_SUBSCR_LIST_INT",
    "BINARY_SUBSCR_TUPLE_INT",
    // CALL
    "CALL_PY_EXACT_ARGS",
    "CALL_PY_WITH_DEFAULTS",
    // COMPARE_OP
    "COMPARE_OP_FLOAT_JUMP",
    "COMPARE_OP_INT_JUMP",
    "COMPARE_OP_STR_JUMP",
    // EXTENDED_ARG
    "EXTENDED_ARG_QUICK",
    // JUMP_BACKWARD
    "JUMP_BACKWARD_QUICK",
    // LOAD_ATTR
    "LOAD_ATTR_INSTANCE_VALUE",
    "LOAD_ATTR_MODULE",
    "LOAD_ATTR_SLOT",
    "LOAD_ATTR_WITH_HINT",
    // LOAD_CONST
    "LOAD_CONST__LOAD_FAST",
    // LOAD_FAST
    "LOAD_FAST__LOAD_CONST",
    "LOAD_FAST__LOAD_FAST",
    // LOAD_GLOBAL
    "LOAD_GLOBAL_BUILTIN",
    "LOAD_GLOBAL_MODULE",
    // LOAD_METHOD
    "LOAD_METHOD_CLASS",
    "LOAD_METHOD_MODULE",
    "LOAD_METHOD_NO_DICT",
    "LOAD_METHOD_WITH_DICT",
    "LOAD_METHOD_WITH_VALUES",
    // PRECALL
    "PRECALL_BOUND_METHOD",
    "PRECALL_BUILTIN_CLASS",
    "PRECALL_BUILTIN_FAST_WITH_KEYWORDS",
    "PRECALL_METHOD_DESCRIPTOR_FAST_WITH_KEYWORDS",
    "PRECALL_NO_KW_BUILTIN_FAST",
    "PRECALL_NO_KW_BUILTIN_O",
    "PRECALL_NO_KW_ISINSTANCE",
    "PRECALL_NO_KW_LEN",
    "PRECALL_NO_KW_LIST_APPEND",
    "PRECALL_NO_KW_METHOD_DESCRIPTOR_FAST",
    "PRECALL_NO_KW_METHOD_DESCRIPTOR_NOARGS",
    "PRECALL_NO_KW_METHOD_DESCRIPTOR_O",
    "PRECALL_NO_KW_STR_1",
    "PRECALL_NO_KW_TUPLE_1",
    "PRECALL_NO_KW_TYPE_1",
    "PRECALL_PYFUNC",
    // RESUME
    "RESUME_QUICK",
    // STORE_ATTR
    "STORE_ATTR_INSTANCE_VALUE",
    "STORE_ATTR_SLOT",
    "STORE_ATTR_WITH_HINT",
    // STORE_FAST
    "STORE_FAST__LOAD_FAST",
    "STORE_FAST__STORE_FAST",
    // STORE_SUBSCR
    "STORE_SUBSCR_DICT",
    "STORE_SUBSCR_LIST_INT",
    // UNPACK_SEQUENCE
    "UNPACK_SEQUENCE_LIST",
    "UNPACK_SEQUENCE_TUPLE",
    "UNPACK_SEQUENCE_TWO_TUPLE",
];

/// Fused superinstructions: one opcode encoding multiple original
/// operations. An instruction directly following one of these was folded
/// into it and never executes unspecialized on its own — unless it is a
/// jump target, in which case it can also be entered directly.
const SUPERINSTRUCTIONS: &[&str] = &[
    "LOAD_CONST__LOAD_FAST",
    "LOAD_FAST__LOAD_CONST",
    "LOAD_FAST__LOAD_FAST",
    "STORE_FAST__LOAD_FAST",
    "STORE_FAST__STORE_FAST",
];

/// Precomputed opcode classification table, built once at startup.
#[derive(Debug)]
pub struct OpcodeTable {
    categories: HashMap<&'static str, OpcodeCategory>,
    superinstructions: HashSet<&'static str>,
}

impl OpcodeTable {
    pub fn new() -> Self {
        let mut categories = HashMap::new();
        for name in ADAPTIVE_INSTRUCTIONS {
            categories.insert(*name, OpcodeCategory::Adaptive);
        }
        for name in SPECIALIZED_INSTRUCTIONS {
            categories.insert(*name, OpcodeCategory::Specialized);
        }
        Self {
            categories,
            superinstructions: SUPERINSTRUCTIONS.iter().copied().collect(),
        }
    }

    /// Category of an opcode within the specializable families, if any.
    pub fn category(&self, opname: &str) -> Option<OpcodeCategory> {
        self.categories.get(opname).copied()
    }

    pub fn is_superinstruction(&self, opname: &str) -> bool {
        self.superinstructions.contains(opname)
    }

    /// Score one instruction given the instruction immediately preceding it
    /// in bytecode order (including predecessors whose positions were
    /// unresolved and skipped for attribution).
    pub fn classify(
        &self,
        instruction: &InstructionRecord,
        previous: Option<&InstructionRecord>,
    ) -> Stats {
        match self.category(&instruction.opname) {
            Some(OpcodeCategory::Adaptive) => Stats::ADAPTIVE,
            Some(OpcodeCategory::Specialized) => Stats::SPECIALIZED,
            None => {
                if let Some(previous) = previous {
                    if self.is_superinstruction(&previous.opname) && !instruction.is_jump_target {
                        // Folded into the prior fused form.
                        return Stats::SPECIALIZED;
                    }
                }
                Stats::UNQUICKENED
            }
        }
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::new()
    }
}
