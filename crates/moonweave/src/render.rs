//! Deterministic flattening of a fragment tree into program text.
//!
//! Rendering walks regions depth-first and emits into a line buffer. Key and
//! argument declarations bind their names to globally renumbered `KEYS`/
//! `ARGV` positions: the context keeps its own monotonically increasing
//! counters, incremented once per emitted declaration, so slot numbers stay
//! consistent across nested and repeated inclusions. A once-only fragment
//! that was already rendered in this pass contributes nothing and leaves the
//! counters untouched.
//!
//! All state lives in a per-call context; rendering the same tree repeatedly
//! is idempotent.

use std::collections::HashSet;

use log::debug;

use moonweave_core::{Fragment, Region, ValueType};

/// Render a fragment tree into the flattened program text.
pub fn render(fragment: &Fragment) -> String {
    let mut context = RenderContext::new();
    context.render_fragment(fragment);

    debug!(
        name = fragment.name(),
        lines = context.lines.len(),
        keys = context.key_index - 1,
        args = context.arg_index - 1;
        "Rendered fragment"
    );

    context.lines.join("\n")
}

/// Per-call rendering state: slot counters and the rendered-fragment set.
struct RenderContext {
    key_index: usize,
    arg_index: usize,
    rendered: HashSet<String>,
    lines: Vec<String>,
}

impl RenderContext {
    fn new() -> Self {
        Self {
            key_index: 1,
            arg_index: 1,
            rendered: HashSet::new(),
            lines: Vec::new(),
        }
    }

    fn render_fragment(&mut self, fragment: &Fragment) {
        if self.rendered.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
            return;
        }
        self.rendered.insert(fragment.name().to_string());

        for region in fragment.regions() {
            match region {
                Region::Text { content } => {
                    self.lines.extend(content.split('\n').map(str::to_string));
                }
                Region::Key { name, .. } => {
                    let line = format!("local {name} = KEYS[{}]", self.key_index);
                    self.key_index += 1;
                    self.lines.push(line);
                }
                Region::Arg {
                    name, value_type, ..
                } => {
                    let line = self.render_arg(name, *value_type);
                    self.arg_index += 1;
                    self.lines.push(line);
                }
                Region::Return { value_type, .. } => {
                    self.lines
                        .push(format!("-- Expected return type is: {value_type}"));
                }
                Region::Pragma { pragma, .. } => {
                    self.lines.push(format!("-- Pragma: {pragma}"));
                }
                Region::Include { fragment, .. } => self.render_fragment(fragment),
            }
        }
    }

    fn render_arg(&self, name: &str, value_type: ValueType) -> String {
        let index = self.arg_index;

        match value_type {
            ValueType::Integer => format!("local {name} = tonumber(ARGV[{index}])"),
            ValueType::Boolean => format!("local {name} = tonumber(ARGV[{index}]) ~= 0"),
            ValueType::List | ValueType::Dict => {
                format!("local {name} = cjson.decode(ARGV[{index}])")
            }
            ValueType::String => format!("local {name} = ARGV[{index}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use moonweave_parser::{FragmentCache, MemorySource, parse, resolve};

    use super::*;

    fn source(fragments: &[(&str, &str)]) -> MemorySource {
        let mut source = MemorySource::new();
        for (name, content) in fragments {
            source.insert(*name, *content);
        }
        source
    }

    #[test]
    fn test_render_text_only() {
        let mut cache = FragmentCache::new();
        let fragment = parse("foo", "a\nb\nc", &source(&[]), &mut cache).unwrap();

        assert_eq!(render(&fragment), "a\nb\nc");
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "foo",
            "%key k\n%arg a integer\nreturn redis.call('GET', k)",
            &source(&[]),
            &mut cache,
        )
        .unwrap();

        let first = render(&fragment);
        let second = render(&fragment);

        assert_eq!(first, second);
        assert_eq!(
            first,
            "local k = KEYS[1]\nlocal a = tonumber(ARGV[1])\nreturn redis.call('GET', k)"
        );
    }

    #[test]
    fn test_render_numbers_keys_globally() {
        let fragments = source(&[
            ("a", "%key key1"),
            ("b", "%key key2"),
            ("c", "%key key3"),
            ("d", "%include \"c\"\n%key key4"),
        ]);
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "abcd",
            "%include \"a\"\n%include \"b\"\n%include \"d\"",
            &fragments,
            &mut cache,
        )
        .unwrap();

        assert_eq!(
            render(&fragment).split('\n').collect::<Vec<_>>(),
            [
                "local key1 = KEYS[1]",
                "local key2 = KEYS[2]",
                "local key3 = KEYS[3]",
                "local key4 = KEYS[4]",
            ]
        );
    }

    #[test]
    fn test_render_numbers_args_globally_with_types() {
        let fragments = source(&[
            ("a", "%arg arg1"),
            ("b", "%arg arg2 boolean"),
            ("d", "%arg arg3 dict\n%arg arg4 integer"),
        ]);
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "abd",
            "%include \"a\"\n%include \"b\"\n%include \"d\"",
            &fragments,
            &mut cache,
        )
        .unwrap();

        assert_eq!(
            render(&fragment).split('\n').collect::<Vec<_>>(),
            [
                "local arg1 = ARGV[1]",
                "local arg2 = tonumber(ARGV[2]) ~= 0",
                "local arg3 = cjson.decode(ARGV[3])",
                "local arg4 = tonumber(ARGV[4])",
            ]
        );
    }

    #[test]
    fn test_render_repeats_plain_duplicate_includes() {
        let fragments = source(&[("a", "a"), ("b", "b\n%include \"a\"")]);
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "c",
            "%include \"a\"\n%include \"b\"\n%include \"b\"",
            &fragments,
            &mut cache,
        )
        .unwrap();

        assert_eq!(render(&fragment), "a\nb\na\nb\na");
    }

    #[test]
    fn test_render_elides_once_duplicates() {
        let fragments = source(&[
            ("a", "%pragma once\na"),
            ("b", "%pragma once\nb\n%include \"a\""),
        ]);
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "c",
            "%include \"a\"\n%include \"b\"\n%include \"b\"",
            &fragments,
            &mut cache,
        )
        .unwrap();

        assert_eq!(render(&fragment), "-- Pragma: once\na\n-- Pragma: once\nb");
    }

    #[test]
    fn test_once_fragment_slots_numbered_once() {
        let fragments = source(&[("shared", "%pragma once\n%key k1\n%arg a1")]);
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "top",
            "%include \"shared\"\n%include \"shared\"\n%key k2",
            &fragments,
            &mut cache,
        )
        .unwrap();

        assert_eq!(
            render(&fragment),
            "-- Pragma: once\nlocal k1 = KEYS[1]\nlocal a1 = ARGV[1]\nlocal k2 = KEYS[2]"
        );
    }

    #[test]
    fn test_render_line_count_matches_line_index() {
        let fragments = source(&[
            ("once", "%pragma once\nshared line"),
            ("mid", "mid\n%include \"once\""),
        ]);
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "top",
            "%include \"once\"\n%include \"mid\"\n%include \"once\"\ntail",
            &fragments,
            &mut cache,
        )
        .unwrap();

        let program = render(&fragment);
        assert_eq!(program.split('\n').count(), fragment.line_count());
    }

    #[test]
    fn test_render_return_and_pragma_comments() {
        let mut cache = FragmentCache::new();
        let fragment = parse(
            "foo",
            "%pragma once\n%return integer\nreturn 42",
            &source(&[]),
            &mut cache,
        )
        .unwrap();

        assert_eq!(
            render(&fragment),
            "-- Pragma: once\n-- Expected return type is: integer\nreturn 42"
        );
    }

    #[test]
    fn test_resolve_and_render_from_source() {
        let fragments = source(&[("top", "%include \"lib/util\"\nret"), ("lib/util", "u")]);
        let mut cache = FragmentCache::new();
        let fragment = resolve("top", &fragments, &mut cache).unwrap();

        assert_eq!(render(&fragment), "u\nret");
    }
}
