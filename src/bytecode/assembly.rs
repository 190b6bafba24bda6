/*!
  The human readable textual form of bytecode is called assembly. This
  module leverages the `strum` derives of `Operation` to deserialize
  instruction listings: one instruction per line, written
  `Name(operands…)`, with `#` comments and blank lines ignored. Register
  operands are bare digits 0–7, and the `LoadValue` immediate is an
  unsigned decimal below 2^25. Only the operands an operation actually
  uses are written; unused register fields encode as zero.

  Regression-test programs are authored in this form and assembled to
  binary words with `assemble`.
*/

use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  bytes::complete::is_not,
  character::complete::{alpha1, char as one_char, digit1, line_ending, space0},
  combinator::{map, opt},
  error::ErrorKind,
  multi::{many0, many1, separated_list},
  sequence::{delimited, pair, preceded, tuple},
};
use thiserror::Error;

use crate::bytecode::{encode_instruction, Instruction, Operation, Word};
use crate::registers::RegisterIndex;

pub enum ParsedAssemblySyntax<'a> {
  Instruction(Instruction),
  NotAnOperation {
    line: u32,
    name: &'a str,
  },
  WrongArity {
    line: u32,
    operation: Operation,
    args: Vec<&'a str>,
  },
  OperandOutOfRange {
    line: u32,
    operation: Operation,
    operand: &'a str,
  },
}
// Abbreviated name internally
use ParsedAssemblySyntax as Syntax;

impl<'a> Display for ParsedAssemblySyntax<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Syntax::Instruction(instruction) => {
        write!(f, "{}", instruction)
      }

      Syntax::NotAnOperation { line, name } => {
        write!(f, "Error on line {}: {} is not an operation.", line, name)
      }

      Syntax::WrongArity { line, operation, args } => {
        write!(
          f,
          "Error on line {}: {} takes {} operands but was given {}: ({})",
          line,
          operation,
          operation.arity(),
          args.len(),
          args.join(", ")
        )
      }

      Syntax::OperandOutOfRange { line, operation, operand } => {
        write!(
          f,
          "Error on line {}: {} cannot take the operand {}.",
          line, operation, operand
        )
      }

    }
  }
}

fn parse_register(token: &str) -> Option<RegisterIndex> {
  match token.parse::<Word>() {
    Ok(number) if number <= 7 => Some(RegisterIndex::from_field(number)),
    _ => None,
  }
}

/// Distributes the operand tokens of one parsed line into the register
/// fields (or the immediate) the operation uses.
fn build_instruction<'a>(name: &'a str, args: Vec<&'a str>, line: u32) -> ParsedAssemblySyntax<'a> {
  let operation = match Operation::from_str(name) {
    Ok(operation) => operation,
    Err(_) => return Syntax::NotAnOperation { line, name },
  };
  if args.len() != operation.arity() {
    return Syntax::WrongArity { line, operation, args };
  }

  // The trailing operand of LoadValue is the immediate, not a register.
  let register_count = match operation {
    Operation::LoadValue => 1,
    _ => args.len(),
  };
  let mut registers = Vec::with_capacity(register_count);
  for &token in args[..register_count].iter() {
    match parse_register(token) {
      Some(register) => registers.push(register),
      None => return Syntax::OperandOutOfRange { line, operation, operand: token },
    }
  }

  let r0 = RegisterIndex::from_field(0);
  let instruction = match operation {

    Operation::LoadValue => {
      let value = match args[1].parse::<Word>() {
        Ok(value) if value < (1 << 25) => value,
        _ => return Syntax::OperandOutOfRange { line, operation, operand: args[1] },
      };
      Instruction::LoadValue { a: registers[0], value }
    }

    Operation::Halt => Instruction::ThreeRegister {
      opcode: operation,
      a: r0,
      b: r0,
      c: r0,
    },

    | Operation::Output
    | Operation::Input
    | Operation::UnmapSegment => Instruction::ThreeRegister {
      opcode: operation,
      a: r0,
      b: r0,
      c: registers[0],
    },

    | Operation::MapSegment
    | Operation::LoadProgram => Instruction::ThreeRegister {
      opcode: operation,
      a: r0,
      b: registers[0],
      c: registers[1],
    },

    _ => Instruction::ThreeRegister {
      opcode: operation,
      a: registers[0],
      b: registers[1],
      c: registers[2],
    },

  };

  Syntax::Instruction(instruction)
}

pub fn parse_assembly(
  text: &str,
) -> Result<(&str, Vec<ParsedAssemblySyntax>), nom::Err<(&str, ErrorKind)>> {
  // Primitive line accounting for diagnostics.
  let line_number: RefCell<u32> = RefCell::new(1);

  let comment_p = pair(one_char('#'), opt(is_not("\n\r")));
  let newline_p = map(
    preceded::<&str, _, _, (&str, ErrorKind), _, _>(
      tuple((space0, opt(comment_p))),
      line_ending,
    ),
    |out| {
      let mut line_number_ref = line_number.borrow_mut();
      *line_number_ref = *line_number_ref + 1;
      out
    },
  );

  let operands_p = separated_list::<&str, _, _, (&str, ErrorKind), _, _>(
    delimited(space0, one_char(','), space0),
    digit1,
  );
  let instruction_p = map(
    pair::<&str, _, _, (&str, ErrorKind), _, _>(
      alpha1,
      opt(delimited(
        delimited(space0, one_char('('), space0),
        operands_p,
        preceded(space0, one_char(')')),
      )),
    ),
    |(name, operands): (&str, Option<Vec<&str>>)| {
      build_instruction(name, operands.unwrap_or_default(), *line_number.borrow())
    },
  );

  let listing_p = delimited::<&str, _, _, _, (&str, ErrorKind), _, _, _>(
    many0(&newline_p),
    separated_list(many1(&newline_p), delimited(space0, &instruction_p, space0)),
    many0(&newline_p),
  );

  listing_p(text)
}

/// Errors from `assemble`.
#[derive(Debug, Error)]
pub enum AssemblyError {
  /// The text did not parse as an instruction listing.
  #[error("malformed assembly near {0:?}")]
  Malformed(String),
  /// The listing parsed, but some lines were not valid instructions.
  #[error("{0}")]
  Invalid(String),
}

/**
  Assembles a listing into binary words, reporting every diagnostic the
  parse produced if any line was not a valid instruction.
*/
pub fn assemble(text: &str) -> Result<Vec<Word>, AssemblyError> {
  let (rest, parsed) =
    parse_assembly(text).map_err(|_| AssemblyError::Malformed(prefix_of(text)))?;
  if !rest.trim().is_empty() {
    return Err(AssemblyError::Malformed(prefix_of(rest)));
  }

  let mut words = Vec::with_capacity(parsed.len());
  let mut diagnostics = Vec::new();
  for syntax in &parsed {
    match syntax {
      Syntax::Instruction(instruction) => words.push(encode_instruction(instruction)),
      problem => diagnostics.push(problem.to_string()),
    }
  }

  match diagnostics.is_empty() {
    true => Ok(words),
    false => Err(AssemblyError::Invalid(diagnostics.join("\n"))),
  }
}

fn prefix_of(text: &str) -> String {
  text.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const LISTING: &str = "
# A character, printed.
LoadValue(1, 60)
Output( 1 )     # trailing comment

  Halt
";

  #[test]
  fn parses_and_assembles_a_listing() {
    let r0 = RegisterIndex::from_field(0);
    let r1 = RegisterIndex::from_field(1);
    let expected = vec![
      encode_instruction(&Instruction::LoadValue { a: r1, value: 60 }),
      encode_instruction(&Instruction::ThreeRegister {
        opcode: Operation::Output,
        a: r0,
        b: r0,
        c: r1,
      }),
      encode_instruction(&Instruction::ThreeRegister {
        opcode: Operation::Halt,
        a: r0,
        b: r0,
        c: r0,
      }),
    ];
    assert_eq!(assemble(LISTING).unwrap(), expected);
  }

  #[test]
  fn reports_unknown_operations_and_bad_operands() {
    let (rest, parsed) = parse_assembly("Robert(2)\nOutput(1, 2)\nAdd(1, 2, 9)").unwrap();
    assert!(rest.is_empty());
    assert_eq!(parsed.len(), 3);
    assert!(matches!(
      parsed[0],
      Syntax::NotAnOperation { line: 1, name: "Robert" }
    ));
    assert!(matches!(parsed[1], Syntax::WrongArity { line: 2, .. }));
    assert!(matches!(parsed[2], Syntax::OperandOutOfRange { line: 3, .. }));
  }

  #[test]
  fn rejects_an_oversized_immediate() {
    // 2^25 is one past the largest encodable immediate.
    match assemble("LoadValue(1, 33554432)") {
      Err(AssemblyError::Invalid(message)) => assert!(message.contains("33554432")),
      other => panic!("expected a diagnostic, got {:?}", other),
    }
  }
}
