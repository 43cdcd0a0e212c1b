//! Instruction stream scanning.
//!
//! Rewriting never touches the bytecode itself: every symbolic operand is an
//! index into the constant pool. The scan here locates those operands so they
//! can be enumerated and checked against the constant kind the opcode needs.

use anyhow::{anyhow, Result};

use crate::attributes::CodeAttribute;
use crate::classfile::ClassFile;
use crate::pool::{ConstantEntry, ConstantPool};

/// An instruction operand that indexes the constant pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOperand {
    pub pc: u32,
    pub opcode: u8,
    pub index: u16,
}

fn read_u8(code: &[u8], at: usize) -> Result<u8> {
    code.get(at)
        .copied()
        .ok_or(anyhow!("instruction operand at {} runs past the end of the code", at))
}

fn read_u16(code: &[u8], at: usize) -> Result<u16> {
    Ok(u16::from_be_bytes([read_u8(code, at)?, read_u8(code, at + 1)?]))
}

fn read_i32(code: &[u8], at: usize) -> Result<i32> {
    Ok(i32::from_be_bytes([
        read_u8(code, at)?,
        read_u8(code, at + 1)?,
        read_u8(code, at + 2)?,
        read_u8(code, at + 3)?,
    ]))
}

fn fixed_length(opcode: u8) -> Result<usize> {
    Ok(match opcode {
        0x00..=0x0f
        | 0x1a..=0x35
        | 0x3b..=0x83
        | 0x85..=0x98
        | 0xac..=0xb1
        | 0xbe
        | 0xbf
        | 0xc2
        | 0xc3
        | 0xca => 1,
        0x10 | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => 2,
        0x11 | 0x84 | 0x99..=0xa8 | 0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        _ => return Err(anyhow!("unknown opcode {:#04x}", opcode)),
    })
}

/// Walk `code` and collect every constant pool operand in program order.
pub fn pool_operands(code: &[u8]) -> Result<Vec<PoolOperand>> {
    let mut operands = vec![];
    let mut pc = 0;

    while pc < code.len() {
        let opcode = code[pc];
        let mut push = |index: u16| {
            operands.push(PoolOperand {
                pc: pc as u32,
                opcode,
                index,
            })
        };

        let length = match opcode {
            // ldc
            0x12 => {
                push(read_u8(code, pc + 1)? as u16);
                2
            }
            // ldc_w, ldc2_w, field access, invokes, new, anewarray, checkcast, instanceof
            0x13 | 0x14 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1 => {
                push(read_u16(code, pc + 1)?);
                3
            }
            // invokeinterface, invokedynamic
            0xb9 | 0xba => {
                push(read_u16(code, pc + 1)?);
                5
            }
            // multianewarray
            0xc5 => {
                push(read_u16(code, pc + 1)?);
                4
            }
            // tableswitch, operands are 4-byte aligned from the start of the code
            0xaa => {
                let padding = (4 - (pc + 1) % 4) % 4;
                let base = pc + 1 + padding;
                let low = read_i32(code, base + 4)?;
                let high = read_i32(code, base + 8)?;
                if high < low {
                    return Err(anyhow!("tableswitch at {} has high < low", pc));
                }
                let cases = (high as i64 - low as i64 + 1) as usize;
                1 + padding + 12 + 4 * cases
            }
            // lookupswitch
            0xab => {
                let padding = (4 - (pc + 1) % 4) % 4;
                let base = pc + 1 + padding;
                let pairs = read_i32(code, base + 4)?;
                if pairs < 0 {
                    return Err(anyhow!("lookupswitch at {} has a negative pair count", pc));
                }
                1 + padding + 8 + 8 * pairs as usize
            }
            // wide, iinc carries an extra 2 byte constant
            0xc4 => match read_u8(code, pc + 1)? {
                0x84 => 6,
                0x15..=0x19 | 0x36..=0x3a | 0xa9 => 4,
                other => return Err(anyhow!("wide cannot modify opcode {:#04x}", other)),
            },
            _ => fixed_length(opcode)?,
        };

        pc += length;
    }

    // Format checking: the last instruction must end exactly at the end of the code
    if pc != code.len() {
        return Err(anyhow!("last instruction overruns the code by {} bytes", pc - code.len()));
    }

    Ok(operands)
}

fn operand_accepts(opcode: u8, entry: &ConstantEntry) -> bool {
    match opcode {
        0x12 | 0x13 => matches!(
            entry,
            ConstantEntry::Integer(_)
                | ConstantEntry::Float(_)
                | ConstantEntry::String(_)
                | ConstantEntry::Class(_)
                | ConstantEntry::MethodType(_)
                | ConstantEntry::MethodHandle(_)
                | ConstantEntry::Dynamic(_)
        ),
        0x14 => matches!(
            entry,
            ConstantEntry::Long(_) | ConstantEntry::Double(_) | ConstantEntry::Dynamic(_)
        ),
        0xb2..=0xb5 => matches!(entry, ConstantEntry::Field(_)),
        0xb6 => matches!(entry, ConstantEntry::Method(_)),
        0xb7 | 0xb8 => matches!(
            entry,
            ConstantEntry::Method(_) | ConstantEntry::InterfaceMethod(_)
        ),
        0xb9 => matches!(entry, ConstantEntry::InterfaceMethod(_)),
        0xba => matches!(entry, ConstantEntry::InvokeDynamic(_)),
        0xbb | 0xbd | 0xc0 | 0xc1 | 0xc5 => matches!(entry, ConstantEntry::Class(_)),
        _ => false,
    }
}

impl CodeAttribute {
    pub fn pool_operands(&self) -> Result<Vec<PoolOperand>> {
        pool_operands(&self.code)
    }

    pub fn check_operands(&self, pool: &ConstantPool) -> Result<()> {
        for operand in self.pool_operands()? {
            let entry = pool.get(operand.index)?;
            if !operand_accepts(operand.opcode, entry) {
                return Err(anyhow!(
                    "opcode {:#04x} at {} cannot use a {} constant (#{})",
                    operand.opcode,
                    operand.pc,
                    entry.tag_name(),
                    operand.index
                ));
            }
        }

        Ok(())
    }
}

pub(crate) fn check_operands(class: &ClassFile) -> Result<()> {
    let pool = &class.constant_pool;

    for method in &class.methods.values {
        let code = match method.attributes.known_attribute::<CodeAttribute>(pool)? {
            Some(code) => code,
            None => continue,
        };

        code.check_operands(pool).map_err(|e| {
            anyhow!(
                "bad code in {}{}: {}",
                method.name(pool).unwrap_or_default(),
                method.descriptor(pool).unwrap_or_default(),
                e
            )
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_finds_operands_in_order() -> Result<()> {
        // aload_0, getfield #7, invokevirtual #9, ldc #3, return
        let code = [0x2a, 0xb4, 0x00, 0x07, 0xb6, 0x00, 0x09, 0x12, 0x03, 0xb1];
        let operands = pool_operands(&code)?;

        assert_eq!(
            operands,
            vec![
                PoolOperand { pc: 1, opcode: 0xb4, index: 7 },
                PoolOperand { pc: 4, opcode: 0xb6, index: 9 },
                PoolOperand { pc: 7, opcode: 0x12, index: 3 },
            ]
        );

        Ok(())
    }

    #[test]
    fn it_skips_switch_padding() -> Result<()> {
        // iload_0, tableswitch (2 bytes padding) default=0 low=0 high=1 [0, 0], new #4
        let mut code = vec![0x1a, 0xaa, 0x00, 0x00];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&[0xbb, 0x00, 0x04]);

        let operands = pool_operands(&code)?;
        assert_eq!(operands.len(), 1);
        assert_eq!(operands[0].index, 4);
        assert_eq!(operands[0].pc as usize, code.len() - 3);

        Ok(())
    }

    #[test]
    fn it_handles_wide_iinc() -> Result<()> {
        // wide iinc 256 by 1, return
        let code = [0xc4, 0x84, 0x01, 0x00, 0x00, 0x01, 0xb1];
        assert!(pool_operands(&code)?.is_empty());

        Ok(())
    }

    #[test]
    fn it_rejects_truncated_code() {
        assert!(pool_operands(&[0xb6, 0x00]).is_err());
        assert!(pool_operands(&[0xff]).is_err());
    }
}
