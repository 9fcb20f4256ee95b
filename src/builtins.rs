/// How an input slot embeds its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Value,
    Stack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSlot {
    pub name: &'static str,
    pub kind: SlotKind,
}

const fn value(name: &'static str) -> InputSlot {
    InputSlot {
        name,
        kind: SlotKind::Value,
    }
}

const fn stack(name: &'static str) -> InputSlot {
    InputSlot {
        name,
        kind: SlotKind::Stack,
    }
}

/// Static slot layout of a builtin opcode. Field arguments come first, then inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockType {
    pub fields: &'static [&'static str],
    pub inputs: &'static [InputSlot],
    pub optional_trailing: bool,
}

impl BlockType {
    const fn new(fields: &'static [&'static str], inputs: &'static [InputSlot]) -> Self {
        Self {
            fields,
            inputs,
            optional_trailing: false,
        }
    }

    const fn optional_trailing(mut self) -> Self {
        self.optional_trailing = true;
        self
    }

    pub fn max_args(&self) -> usize {
        self.fields.len() + self.inputs.len()
    }

    pub fn min_args(&self) -> usize {
        let total = self.max_args();
        if self.optional_trailing && !self.inputs.is_empty() {
            total - 1
        } else {
            total
        }
    }

    /// Slot an argument position lands in.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        if index < self.fields.len() {
            return Some(Slot::Field(self.fields[index]));
        }
        self.inputs
            .get(index - self.fields.len())
            .copied()
            .map(Slot::Input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Field(&'static str),
    Input(InputSlot),
}

const NUM_PAIR: &[InputSlot] = &[value("NUM1"), value("NUM2")];
const OPERAND_PAIR: &[InputSlot] = &[value("OPERAND1"), value("OPERAND2")];
const STRING_PAIR: &[InputSlot] = &[value("STRING1"), value("STRING2")];
const MESSAGE: &[InputSlot] = &[value("MESSAGE")];
const MESSAGE_SECS: &[InputSlot] = &[value("MESSAGE"), value("SECS")];
const CONDITION_STACK: &[InputSlot] = &[value("CONDITION"), stack("SUBSTACK")];
const VARIABLE: &[&str] = &["VARIABLE"];
const NONE: &[InputSlot] = &[];

const BLOCK_TYPES: &[(&str, BlockType)] = &[
    ("looks_say", BlockType::new(&[], MESSAGE)),
    ("looks_think", BlockType::new(&[], MESSAGE)),
    ("looks_sayforsecs", BlockType::new(&[], MESSAGE_SECS)),
    ("looks_thinkforsecs", BlockType::new(&[], MESSAGE_SECS)),
    ("operator_add", BlockType::new(&[], NUM_PAIR)),
    ("operator_subtract", BlockType::new(&[], NUM_PAIR)),
    ("operator_multiply", BlockType::new(&[], NUM_PAIR)),
    ("operator_divide", BlockType::new(&[], NUM_PAIR)),
    ("operator_mod", BlockType::new(&[], NUM_PAIR)),
    ("operator_and", BlockType::new(&[], OPERAND_PAIR)),
    ("operator_or", BlockType::new(&[], OPERAND_PAIR)),
    ("operator_gt", BlockType::new(&[], OPERAND_PAIR)),
    ("operator_lt", BlockType::new(&[], OPERAND_PAIR)),
    ("operator_equals", BlockType::new(&[], OPERAND_PAIR)),
    ("operator_not", BlockType::new(&[], &[value("OPERAND")]).optional_trailing()),
    ("operator_join", BlockType::new(&[], STRING_PAIR)),
    ("operator_contains", BlockType::new(&[], STRING_PAIR)),
    ("operator_random", BlockType::new(&[], &[value("FROM"), value("TO")])),
    ("operator_round", BlockType::new(&[], &[value("NUM")])),
    ("operator_length", BlockType::new(&[], &[value("STRING")])),
    ("operator_letter_of", BlockType::new(&[], &[value("LETTER"), value("STRING")])),
    ("data_setvariableto", BlockType::new(VARIABLE, &[value("VALUE")])),
    ("data_changevariableby", BlockType::new(VARIABLE, &[value("VALUE")])),
    ("control_if", BlockType::new(&[], CONDITION_STACK)),
    (
        "control_if_else",
        BlockType::new(&[], &[value("CONDITION"), stack("SUBSTACK"), stack("SUBSTACK2")]),
    ),
    ("control_repeat", BlockType::new(&[], &[value("TIMES"), stack("SUBSTACK")])),
    ("control_repeat_until", BlockType::new(&[], CONDITION_STACK)),
    ("control_while", BlockType::new(&[], CONDITION_STACK)),
    ("control_forever", BlockType::new(&[], &[stack("SUBSTACK")])),
    ("control_wait", BlockType::new(&[], &[value("DURATION")])),
    ("control_wait_until", BlockType::new(&[], &[value("CONDITION")])),
    ("motion_movesteps", BlockType::new(&[], &[value("STEPS")])),
    ("motion_turnright", BlockType::new(&[], &[value("DEGREES")])),
    ("motion_turnleft", BlockType::new(&[], &[value("DEGREES")])),
    ("motion_gotoxy", BlockType::new(&[], &[value("X"), value("Y")])),
    ("motion_changexby", BlockType::new(&[], &[value("DX")])),
    ("motion_changeyby", BlockType::new(&[], &[value("DY")])),
    ("motion_setx", BlockType::new(&[], &[value("X")])),
    ("motion_sety", BlockType::new(&[], &[value("Y")])),
    ("sensing_askandwait", BlockType::new(&[], &[value("QUESTION")])),
    ("sensing_answer", BlockType::new(&[], NONE)),
    ("sensing_timer", BlockType::new(&[], NONE)),
    ("sensing_resettimer", BlockType::new(&[], NONE)),
];

pub fn lookup(opcode: &str) -> Option<BlockType> {
    BLOCK_TYPES
        .iter()
        .find(|(name, _)| *name == opcode)
        .map(|(_, bt)| *bt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_precede_inputs() {
        let bt = lookup("data_setvariableto").unwrap();
        assert_eq!(bt.slot(0), Some(Slot::Field("VARIABLE")));
        assert_eq!(bt.slot(1), Some(Slot::Input(value("VALUE"))));
        assert_eq!(bt.slot(2), None);
        assert_eq!((bt.min_args(), bt.max_args()), (2, 2));
    }

    #[test]
    fn optional_trailing_lowers_minimum() {
        let not = lookup("operator_not").unwrap();
        assert_eq!((not.min_args(), not.max_args()), (0, 1));
        let add = lookup("operator_add").unwrap();
        assert_eq!((add.min_args(), add.max_args()), (2, 2));
    }

    #[test]
    fn sub_sequence_slots_are_marked() {
        let bt = lookup("control_if_else").unwrap();
        assert_eq!(bt.slot(0), Some(Slot::Input(value("CONDITION"))));
        assert_eq!(bt.slot(2), Some(Slot::Input(stack("SUBSTACK2"))));
        assert!(lookup("looks_say")
            .unwrap()
            .inputs
            .iter()
            .all(|slot| slot.kind == SlotKind::Value));
    }

    #[test]
    fn unknown_opcodes_are_absent() {
        assert!(lookup("foo").is_none());
        assert!(lookup("procedures_call").is_none());
    }
}
