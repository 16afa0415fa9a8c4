//! Tiny interpreter for the x86 subset the code generator emits.
//!
//! Runs a program from `_start` until `int $0x80` with `%eax == 1` and
//! reports the exit status left in `%ebx`.

#![allow(dead_code)]

use std::collections::HashMap;

const STACK_TOP: i32 = 0x0010_0000;
const STEP_LIMIT: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Reg {
    Eax,
    Ebx,
    Ecx,
    Edx,
    Esp,
    Ebp,
    Al,
    Cl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Reg(Reg),
    Imm(i32),
    Mem(i32, Reg),
}

#[derive(Debug, Clone)]
struct Line {
    mnemonic: String,
    operands: Vec<Operand>,
    target: Option<String>,
}

/// Result of running a program to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Value of `%ebx` at the exit system call
    pub status: i32,
    /// Number of `idivl` instructions executed
    pub divisions: usize,
    /// Number of instructions executed
    pub steps: usize,
}

fn parse_reg(text: &str) -> Result<Reg, String> {
    Ok(match text {
        "%eax" => Reg::Eax,
        "%ebx" => Reg::Ebx,
        "%ecx" => Reg::Ecx,
        "%edx" => Reg::Edx,
        "%esp" => Reg::Esp,
        "%ebp" => Reg::Ebp,
        "%al" => Reg::Al,
        "%cl" => Reg::Cl,
        other => return Err(format!("unknown register {}", other)),
    })
}

fn parse_operand(text: &str) -> Result<Operand, String> {
    if let Some(imm) = text.strip_prefix('$') {
        let value = if let Some(hex) = imm.strip_prefix("0x") {
            i64::from_str_radix(hex, 16)
        } else {
            imm.parse::<i64>()
        }
        .map_err(|e| format!("bad immediate {}: {}", text, e))?;
        return Ok(Operand::Imm(value as i32));
    }
    if text.starts_with('%') {
        return parse_reg(text).map(Operand::Reg);
    }
    let open = text.find('(').ok_or_else(|| format!("bad operand {}", text))?;
    let disp = text[..open]
        .parse::<i32>()
        .map_err(|e| format!("bad displacement {}: {}", text, e))?;
    let reg = parse_reg(text[open + 1..].trim_end_matches(')'))?;
    Ok(Operand::Mem(disp, reg))
}

/// Split assembly text into executable lines and a label table
fn assemble(asm: &str) -> Result<(Vec<Line>, HashMap<String, usize>), String> {
    let mut lines = Vec::new();
    let mut labels = HashMap::new();

    for raw in asm.lines() {
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') || text.starts_with('.') {
            continue;
        }
        if let Some(label) = text.strip_suffix(':') {
            labels.insert(label.to_string(), lines.len());
            continue;
        }

        let (mnemonic, rest) = text.split_once(' ').unwrap_or((text, ""));
        let mut line = Line {
            mnemonic: mnemonic.to_string(),
            operands: Vec::new(),
            target: None,
        };
        if mnemonic.starts_with('j') || mnemonic == "call" {
            line.target = Some(rest.trim().to_string());
        } else if !rest.is_empty() {
            for operand in rest.split(", ") {
                line.operands.push(parse_operand(operand.trim())?);
            }
        }
        lines.push(line);
    }

    Ok((lines, labels))
}

struct Machine {
    regs: HashMap<Reg, i32>,
    memory: HashMap<i32, i32>,
    /// Operands of the last `cmpl` as (destination, source)
    compared: (i32, i32),
    divisions: usize,
}

impl Machine {
    fn new() -> Self {
        let mut regs = HashMap::new();
        for reg in [Reg::Eax, Reg::Ebx, Reg::Ecx, Reg::Edx] {
            regs.insert(reg, 0);
        }
        regs.insert(Reg::Esp, STACK_TOP);
        regs.insert(Reg::Ebp, STACK_TOP);
        Self {
            regs,
            memory: HashMap::new(),
            compared: (0, 0),
            divisions: 0,
        }
    }

    fn reg(&self, reg: Reg) -> i32 {
        match reg {
            Reg::Al => self.regs[&Reg::Eax] & 0xff,
            Reg::Cl => self.regs[&Reg::Ecx] & 0xff,
            other => self.regs[&other],
        }
    }

    fn set_reg(&mut self, reg: Reg, value: i32) {
        match reg {
            Reg::Al => {
                let eax = self.regs[&Reg::Eax];
                self.regs.insert(Reg::Eax, (eax & !0xff) | (value & 0xff));
            }
            Reg::Cl => {
                let ecx = self.regs[&Reg::Ecx];
                self.regs.insert(Reg::Ecx, (ecx & !0xff) | (value & 0xff));
            }
            other => {
                self.regs.insert(other, value);
            }
        }
    }

    fn read(&self, operand: Operand) -> Result<i32, String> {
        match operand {
            Operand::Reg(reg) => Ok(self.reg(reg)),
            Operand::Imm(value) => Ok(value),
            Operand::Mem(disp, base) => {
                let addr = self.reg(base).wrapping_add(disp);
                self.memory
                    .get(&addr)
                    .copied()
                    .ok_or_else(|| format!("read of uninitialized memory at {:#x}", addr))
            }
        }
    }

    fn write(&mut self, operand: Operand, value: i32) -> Result<(), String> {
        match operand {
            Operand::Reg(reg) => self.set_reg(reg, value),
            Operand::Mem(disp, base) => {
                let addr = self.reg(base).wrapping_add(disp);
                self.memory.insert(addr, value);
            }
            Operand::Imm(_) => return Err("write to immediate".to_string()),
        }
        Ok(())
    }

    fn push(&mut self, value: i32) {
        let esp = self.reg(Reg::Esp) - 4;
        self.set_reg(Reg::Esp, esp);
        self.memory.insert(esp, value);
    }

    fn pop(&mut self) -> Result<i32, String> {
        let esp = self.reg(Reg::Esp);
        let value = self
            .memory
            .get(&esp)
            .copied()
            .ok_or_else(|| format!("pop from empty stack at {:#x}", esp))?;
        self.set_reg(Reg::Esp, esp + 4);
        Ok(value)
    }

    fn condition(&self, cond: &str) -> Result<bool, String> {
        let (dst, src) = self.compared;
        Ok(match cond {
            "e" => dst == src,
            "ne" => dst != src,
            "l" => dst < src,
            "le" => dst <= src,
            "g" => dst > src,
            "ge" => dst >= src,
            other => return Err(format!("unknown condition {}", other)),
        })
    }

    /// Apply a two-operand instruction `dst = f(dst, src)`
    fn binary(&mut self, line: &Line, f: impl Fn(i32, i32) -> i32) -> Result<(), String> {
        let src = self.read(line.operands[0])?;
        let dst = self.read(line.operands[1])?;
        self.write(line.operands[1], f(dst, src))
    }

    fn unary(&mut self, line: &Line, f: impl Fn(i32) -> i32) -> Result<(), String> {
        let value = self.read(line.operands[0])?;
        self.write(line.operands[0], f(value))
    }
}

/// Run `asm` from `_start` until the exit system call
pub fn run(asm: &str) -> Result<Outcome, String> {
    let (lines, labels) = assemble(asm)?;
    let jump = |label: &Option<String>| -> Result<usize, String> {
        let label = label.as_deref().unwrap_or_default();
        labels
            .get(label)
            .copied()
            .ok_or_else(|| format!("undefined label {}", label))
    };

    let mut machine = Machine::new();
    let mut pc = jump(&Some("_start".to_string()))?;

    for steps in 1..=STEP_LIMIT {
        let line = lines
            .get(pc)
            .ok_or_else(|| format!("fell off the end of the program at {}", pc))?;
        pc += 1;

        match line.mnemonic.as_str() {
            "movl" => {
                let value = machine.read(line.operands[0])?;
                machine.write(line.operands[1], value)?;
            }
            "pushl" => {
                let value = machine.read(line.operands[0])?;
                machine.push(value);
            }
            "popl" => {
                let value = machine.pop()?;
                machine.write(line.operands[0], value)?;
            }
            "addl" => machine.binary(line, i32::wrapping_add)?,
            "subl" => machine.binary(line, i32::wrapping_sub)?,
            "imull" => machine.binary(line, i32::wrapping_mul)?,
            "andl" => machine.binary(line, |d, s| d & s)?,
            "orl" => machine.binary(line, |d, s| d | s)?,
            "xorl" => machine.binary(line, |d, s| d ^ s)?,
            "sall" => machine.binary(line, |d, s| d.wrapping_shl((s & 31) as u32))?,
            "sarl" => machine.binary(line, |d, s| d.wrapping_shr((s & 31) as u32))?,
            "negl" => machine.unary(line, i32::wrapping_neg)?,
            "notl" => machine.unary(line, |v| !v)?,
            "incl" => machine.unary(line, |v| v.wrapping_add(1))?,
            "decl" => machine.unary(line, |v| v.wrapping_sub(1))?,
            "cdq" => {
                let eax = machine.reg(Reg::Eax);
                machine.set_reg(Reg::Edx, if eax < 0 { -1 } else { 0 });
            }
            "idivl" => {
                let divisor = i64::from(machine.read(line.operands[0])?);
                if divisor == 0 {
                    return Err("division by zero".to_string());
                }
                let high = i64::from(machine.reg(Reg::Edx));
                let low = i64::from(machine.reg(Reg::Eax) as u32);
                let dividend = (high << 32) | low;
                machine.set_reg(Reg::Eax, (dividend / divisor) as i32);
                machine.set_reg(Reg::Edx, (dividend % divisor) as i32);
                machine.divisions += 1;
            }
            "cmpl" => {
                let src = machine.read(line.operands[0])?;
                let dst = machine.read(line.operands[1])?;
                machine.compared = (dst, src);
            }
            "jmp" => pc = jump(&line.target)?,
            "call" => {
                machine.push(pc as i32);
                pc = jump(&line.target)?;
            }
            "ret" => pc = machine.pop()? as usize,
            "int" => {
                if machine.read(line.operands[0])? == 0x80 && machine.reg(Reg::Eax) == 1 {
                    return Ok(Outcome {
                        status: machine.reg(Reg::Ebx),
                        divisions: machine.divisions,
                        steps,
                    });
                }
                return Err("unsupported interrupt".to_string());
            }
            mnemonic => {
                if let Some(cond) = mnemonic.strip_prefix("set") {
                    let value = i32::from(machine.condition(cond)?);
                    machine.write(line.operands[0], value)?;
                } else if let Some(cond) = mnemonic.strip_prefix('j') {
                    if machine.condition(cond)? {
                        pc = jump(&line.target)?;
                    }
                } else {
                    return Err(format!("unsupported instruction {}", mnemonic));
                }
            }
        }
    }

    Err("step limit exceeded".to_string())
}

/// Compile `source` and run it, returning the exit status
pub fn compile_and_run(source: &str) -> Outcome {
    let reporter = ccomp::DiagnosticReporter::silent();
    let output = ccomp::compile_source(source, &reporter);
    let asm = output
        .assembly
        .unwrap_or_else(|| panic!("compilation failed: {:?}", reporter.diagnostics()));
    run(&asm).unwrap_or_else(|e| panic!("execution failed: {}\n{}", e, asm))
}
