//! Minimal class-file writer.
//!
//! Emits version 52 (Java 8) class files with a constant pool of `Utf8` and
//! `Class` entries only: fields, method signatures and a `SourceFile`
//! attribute. Method bodies are not emitted, so concrete methods are
//! written as `native`.

use rustc_hash::FxHashMap;

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const MAJOR_VERSION: u16 = 52;

pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
}

const TAG_UTF8: u8 = 1;
const TAG_CLASS: u8 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Constant {
    Utf8(String),
    Class(u16),
}

/// Deduplicating constant pool. Indices start at 1.
#[derive(Debug, Default)]
struct ConstantPool {
    entries: Vec<Constant>,
    index: FxHashMap<Constant, u16>,
}

impl ConstantPool {
    fn add(&mut self, constant: Constant) -> u16 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }
        // Pool size is bounded by the declarations of one class.
        let idx = u16::try_from(self.entries.len() + 1).unwrap_or(u16::MAX);
        self.entries.push(constant.clone());
        self.index.insert(constant, idx);
        idx
    }

    fn utf8(&mut self, text: &str) -> u16 {
        self.add(Constant::Utf8(text.to_string()))
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.add(Constant::Class(name))
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, len_u16(self.entries.len() + 1));
        for entry in &self.entries {
            match entry {
                Constant::Utf8(text) => {
                    out.push(TAG_UTF8);
                    put_u16(out, len_u16(text.len()));
                    out.extend_from_slice(text.as_bytes());
                }
                Constant::Class(name) => {
                    out.push(TAG_CLASS);
                    put_u16(out, *name);
                }
            }
        }
    }
}

#[derive(Debug)]
struct Member {
    access: u16,
    name: u16,
    descriptor: u16,
}

/// Builder for one class file.
#[derive(Debug)]
pub struct ClassWriter {
    pool: ConstantPool,
    access: u16,
    this_class: u16,
    super_class: u16,
    fields: Vec<Member>,
    methods: Vec<Member>,
    source_file: Option<(u16, u16)>,
}

impl ClassWriter {
    pub fn new(access: u16, internal_name: &str, super_name: &str) -> Self {
        let mut pool = ConstantPool::default();
        let this_class = pool.class(internal_name);
        let super_class = pool.class(super_name);
        ClassWriter {
            pool,
            access,
            this_class,
            super_class,
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
        }
    }

    pub fn field(&mut self, access: u16, name: &str, descriptor: &str) {
        let member = Member {
            access,
            name: self.pool.utf8(name),
            descriptor: self.pool.utf8(descriptor),
        };
        self.fields.push(member);
    }

    pub fn method(&mut self, access: u16, name: &str, descriptor: &str) {
        let member = Member {
            access,
            name: self.pool.utf8(name),
            descriptor: self.pool.utf8(descriptor),
        };
        self.methods.push(member);
    }

    pub fn source_file(&mut self, name: &str) {
        let attribute = self.pool.utf8("SourceFile");
        let value = self.pool.utf8(name);
        self.source_file = Some((attribute, value));
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        put_u16(&mut out, 0);
        put_u16(&mut out, MAJOR_VERSION);
        self.pool.write(&mut out);
        put_u16(&mut out, self.access);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, self.super_class);
        // interfaces
        put_u16(&mut out, 0);
        for members in [&self.fields, &self.methods] {
            put_u16(&mut out, len_u16(members.len()));
            for member in members {
                put_u16(&mut out, member.access);
                put_u16(&mut out, member.name);
                put_u16(&mut out, member.descriptor);
                put_u16(&mut out, 0);
            }
        }
        match self.source_file {
            Some((attribute, value)) => {
                put_u16(&mut out, 1);
                put_u16(&mut out, attribute);
                out.extend_from_slice(&2u32.to_be_bytes());
                put_u16(&mut out, value);
            }
            None => put_u16(&mut out, 0),
        }
        out
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn len_u16(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
