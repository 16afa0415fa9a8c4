//! x86 (32-bit, AT&T syntax) instruction definitions

use std::fmt;

/// Registers used by the code generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Eax,
    Ebx,
    Ecx,
    Edx,
    Esp,
    Ebp,
    /// Low byte of `%eax`
    Al,
    /// Low byte of `%ecx`, the shift count register
    Cl,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Eax => write!(f, "%eax"),
            Reg::Ebx => write!(f, "%ebx"),
            Reg::Ecx => write!(f, "%ecx"),
            Reg::Edx => write!(f, "%edx"),
            Reg::Esp => write!(f, "%esp"),
            Reg::Ebp => write!(f, "%ebp"),
            Reg::Al => write!(f, "%al"),
            Reg::Cl => write!(f, "%cl"),
        }
    }
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Register direct: %eax
    Reg(Reg),
    /// Immediate: $1
    Imm(i32),
    /// Immediate spelled exactly as written in the source: $42
    Literal(String),
    /// Base plus displacement: -4(%ebp)
    Mem(i32, Reg),
}

impl Operand {
    /// Frame slot at `offset` from the base pointer
    pub fn frame(offset: i32) -> Self {
        Operand::Mem(offset, Reg::Ebp)
    }
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Imm(v) => write!(f, "${}", v),
            Operand::Literal(digits) => write!(f, "${}", digits),
            Operand::Mem(d, r) => write!(f, "{}({})", d, r),
        }
    }
}

/// Condition codes (signed comparisons)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    E,  // Equal
    Ne, // Not Equal
    L,  // Less
    Le, // Less or Equal
    G,  // Greater
    Ge, // Greater or Equal
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::E => write!(f, "e"),
            Cond::Ne => write!(f, "ne"),
            Cond::L => write!(f, "l"),
            Cond::Le => write!(f, "le"),
            Cond::G => write!(f, "g"),
            Cond::Ge => write!(f, "ge"),
        }
    }
}

/// x86 instruction. Operands follow AT&T order: source first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X86Inst {
    // Data movement
    Movl(Operand, Operand),
    Pushl(Operand),
    Popl(Reg),

    // Arithmetic
    Addl(Operand, Operand),
    Subl(Operand, Operand),
    Imull(Operand, Reg),
    Cdq,
    Idivl(Operand),
    Negl(Operand),
    Incl(Operand),
    Decl(Operand),

    // Logical
    Andl(Operand, Operand),
    Orl(Operand, Operand),
    Xorl(Operand, Operand),
    Notl(Operand),

    // Shift (count in %cl)
    Sall(Reg, Operand),
    Sarl(Reg, Operand),

    // Comparison
    Cmpl(Operand, Operand),
    Set(Cond, Reg),

    // Control flow
    Jmp(String),
    Jcc(Cond, String),
    Call(String),
    Ret,
    Int(u8),

    // Pseudo-instructions
    Label(String),
    Comment(String),
    Directive(String),
    Blank,
}

impl X86Inst {
    pub fn format(&self) -> String {
        match self {
            X86Inst::Movl(src, dst) => format!("    movl {}, {}", src, dst),
            X86Inst::Pushl(op) => format!("    pushl {}", op),
            X86Inst::Popl(r) => format!("    popl {}", r),

            X86Inst::Addl(src, dst) => format!("    addl {}, {}", src, dst),
            X86Inst::Subl(src, dst) => format!("    subl {}, {}", src, dst),
            X86Inst::Imull(src, dst) => format!("    imull {}, {}", src, dst),
            X86Inst::Cdq => "    cdq".to_string(),
            X86Inst::Idivl(op) => format!("    idivl {}", op),
            X86Inst::Negl(op) => format!("    negl {}", op),
            X86Inst::Incl(op) => format!("    incl {}", op),
            X86Inst::Decl(op) => format!("    decl {}", op),

            X86Inst::Andl(src, dst) => format!("    andl {}, {}", src, dst),
            X86Inst::Orl(src, dst) => format!("    orl {}, {}", src, dst),
            X86Inst::Xorl(src, dst) => format!("    xorl {}, {}", src, dst),
            X86Inst::Notl(op) => format!("    notl {}", op),

            X86Inst::Sall(count, dst) => format!("    sall {}, {}", count, dst),
            X86Inst::Sarl(count, dst) => format!("    sarl {}, {}", count, dst),

            X86Inst::Cmpl(src, dst) => format!("    cmpl {}, {}", src, dst),
            X86Inst::Set(c, r) => format!("    set{} {}", c, r),

            X86Inst::Jmp(l) => format!("    jmp {}", l),
            X86Inst::Jcc(c, l) => format!("    j{} {}", c, l),
            X86Inst::Call(l) => format!("    call {}", l),
            X86Inst::Ret => "    ret".to_string(),
            X86Inst::Int(v) => format!("    int $0x{:x}", v),

            X86Inst::Label(l) => format!("{}:", l),
            X86Inst::Comment(c) => format!("# {}", c),
            X86Inst::Directive(d) => d.clone(),
            X86Inst::Blank => String::new(),
        }
    }
}
