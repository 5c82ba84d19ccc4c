use pretty_assertions::assert_eq;

use super::*;

/// Decoded pieces of a class file written by [`ClassWriter`].
#[derive(Debug)]
struct Decoded {
    pool: Vec<String>,
    access: u16,
    this_class: String,
    super_class: String,
    fields: Vec<(u16, String, String)>,
    methods: Vec<(u16, String, String)>,
    source_file: Option<String>,
}

struct Reader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u8(&mut self) -> u8 {
        let value = self.bytes[self.pos];
        self.pos += 1;
        value
    }

    fn u16(&mut self) -> u16 {
        let value = u16::from_be_bytes([self.bytes[self.pos], self.bytes[self.pos + 1]]);
        self.pos += 2;
        value
    }

    fn u32(&mut self) -> u32 {
        let hi = u32::from(self.u16());
        let lo = u32::from(self.u16());
        (hi << 16) | lo
    }
}

/// Pool entries rendered as text: `Utf8` as-is, `Class` as `#<idx>`.
fn decode(bytes: &[u8]) -> Decoded {
    let mut r = Reader { bytes, pos: 0 };
    assert_eq!(r.u32(), MAGIC);
    assert_eq!(r.u16(), 0);
    assert_eq!(r.u16(), MAJOR_VERSION);

    let count = r.u16();
    let mut pool = vec![String::new()];
    for _ in 1..count {
        match r.u8() {
            TAG_UTF8 => {
                let len = usize::from(r.u16());
                let text = std::str::from_utf8(&bytes[r.pos..r.pos + len]).unwrap();
                r.pos += len;
                pool.push(text.to_string());
            }
            TAG_CLASS => {
                let idx = r.u16();
                pool.push(format!("#{idx}"));
            }
            tag => panic!("unexpected tag {tag}"),
        }
    }
    let class_name = |pool: &[String], idx: u16| {
        let name_idx: usize = pool[usize::from(idx)][1..].parse().unwrap();
        pool[name_idx].clone()
    };

    let access = r.u16();
    let this_class = class_name(&pool, r.u16());
    let super_class = class_name(&pool, r.u16());
    assert_eq!(r.u16(), 0);

    let mut members = || {
        let count = r.u16();
        (0..count)
            .map(|_| {
                let access = r.u16();
                let name = pool[usize::from(r.u16())].clone();
                let descriptor = pool[usize::from(r.u16())].clone();
                assert_eq!(r.u16(), 0);
                (access, name, descriptor)
            })
            .collect::<Vec<_>>()
    };
    let fields = members();
    let methods = members();

    let source_file = match r.u16() {
        0 => None,
        1 => {
            assert_eq!(pool[usize::from(r.u16())], "SourceFile");
            assert_eq!(r.u32(), 2);
            Some(pool[usize::from(r.u16())].clone())
        }
        n => panic!("unexpected attribute count {n}"),
    };
    assert_eq!(r.pos, bytes.len());

    Decoded {
        pool: pool.split_off(1),
        access,
        this_class,
        super_class,
        fields,
        methods,
        source_file,
    }
}

#[test]
fn empty_class_has_header_and_names() {
    let writer = ClassWriter::new(
        access::PUBLIC | access::FINAL | access::SUPER,
        "foo/MainKt",
        "java/lang/Object",
    );
    let decoded = decode(&writer.finish());
    assert_eq!(decoded.access, 0x0031);
    assert_eq!(decoded.this_class, "foo/MainKt");
    assert_eq!(decoded.super_class, "java/lang/Object");
    assert!(decoded.fields.is_empty());
    assert!(decoded.methods.is_empty());
    assert_eq!(decoded.source_file, None);
}

#[test]
fn members_and_source_file() {
    let mut writer = ClassWriter::new(access::PUBLIC, "Point", "java/lang/Object");
    writer.field(access::PRIVATE, "x", "I");
    writer.method(access::PUBLIC | access::NATIVE, "getX", "()I");
    writer.method(
        access::PUBLIC | access::STATIC | access::NATIVE,
        "main",
        "([Ljava/lang/String;)V",
    );
    writer.source_file("Point.kt");
    let decoded = decode(&writer.finish());

    assert_eq!(decoded.fields, [(0x0002, "x".to_string(), "I".to_string())]);
    assert_eq!(
        decoded.methods,
        [
            (0x0101, "getX".to_string(), "()I".to_string()),
            (
                0x0109,
                "main".to_string(),
                "([Ljava/lang/String;)V".to_string()
            ),
        ]
    );
    assert_eq!(decoded.source_file.as_deref(), Some("Point.kt"));
}

#[test]
fn constants_are_deduplicated() {
    let mut writer = ClassWriter::new(access::PUBLIC, "A", "java/lang/Object");
    writer.method(access::PUBLIC | access::NATIVE, "f", "()I");
    writer.method(access::PUBLIC | access::NATIVE, "g", "()I");
    writer.field(access::PRIVATE, "f", "I");
    let decoded = decode(&writer.finish());
    let count = |text: &str| decoded.pool.iter().filter(|p| *p == text).count();
    assert_eq!(count("()I"), 1);
    assert_eq!(count("f"), 1);
    assert_eq!(count("I"), 1);
}
