// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A minimal shading-language front end: conditional preprocessing,
//! the checks a driver would reject, and reflection of active declarations.
//!
//! This is not a compiler. It evaluates `#define`, `#undef`, `#if`,
//! `#ifdef`, `#ifndef`, `#elif`, `#else`, `#endif` and `#error` so that
//! reflection only reports declarations a real driver would keep active.

use prism_core::renderer::{ShaderStage, UniformType};
use std::collections::HashMap;

/// The active part of one stage after preprocessing.
#[derive(Debug, Default)]
pub struct Preprocessed {
    /// Active source lines with their 1-based line numbers.
    pub lines: Vec<(usize, String)>,
    /// Macros defined at the end of the stage.
    pub defines: HashMap<String, String>,
}

/// A declaration found in the active source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Declared name.
    pub name: String,
    /// Type name as written.
    pub ty: String,
    /// Array length, 1 for scalars.
    pub array_len: u32,
}

struct Frame {
    active: bool,
    taken: bool,
    parent_active: bool,
}

fn is_active(stack: &[Frame]) -> bool {
    stack.last().map_or(true, |f| f.active)
}

/// Runs the preprocessor over `source`.
///
/// Returns the driver-style log on `#error`, unterminated conditionals,
/// or malformed directives.
pub fn preprocess(stage: ShaderStage, source: &str) -> Result<Preprocessed, String> {
    let mut out = Preprocessed::default();
    let mut stack: Vec<Frame> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        let Some(directive) = line.strip_prefix('#') else {
            if is_active(&stack) {
                out.lines.push((line_no, raw.to_string()));
            }
            continue;
        };
        let directive = directive.trim_start();
        let (keyword, rest) = directive
            .split_once(char::is_whitespace)
            .map_or((directive, ""), |(k, r)| (k, r.trim()));

        match keyword {
            "ifdef" | "ifndef" | "if" => {
                let parent_active = is_active(&stack);
                let condition = match keyword {
                    "ifdef" => out.defines.contains_key(rest),
                    "ifndef" => !out.defines.contains_key(rest),
                    _ if parent_active => evaluate(rest, &out.defines)
                        .map_err(|e| format!("ERROR: 0:{line_no}: '#if' : {e}"))?,
                    _ => false,
                };
                stack.push(Frame {
                    active: parent_active && condition,
                    taken: condition,
                    parent_active,
                });
            }
            "elif" => {
                let defines = &out.defines;
                let frame = stack
                    .last_mut()
                    .ok_or_else(|| format!("ERROR: 0:{line_no}: '#elif' : unexpected directive"))?;
                if frame.taken || !frame.parent_active {
                    frame.active = false;
                } else {
                    let condition = evaluate(rest, defines)
                        .map_err(|e| format!("ERROR: 0:{line_no}: '#elif' : {e}"))?;
                    frame.active = condition;
                    frame.taken = condition;
                }
            }
            "else" => {
                let frame = stack
                    .last_mut()
                    .ok_or_else(|| format!("ERROR: 0:{line_no}: '#else' : unexpected directive"))?;
                frame.active = frame.parent_active && !frame.taken;
                frame.taken = true;
            }
            "endif" => {
                stack
                    .pop()
                    .ok_or_else(|| format!("ERROR: 0:{line_no}: '#endif' : unexpected directive"))?;
            }
            _ if !is_active(&stack) => {}
            "define" => {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(n, v)| (n, v.trim()));
                if name.is_empty() {
                    return Err(format!("ERROR: 0:{line_no}: '#define' : missing macro name"));
                }
                out.defines.insert(name.to_string(), value.to_string());
            }
            "undef" => {
                out.defines.remove(rest);
            }
            "error" => {
                return Err(format!("ERROR: 0:{line_no}: '#error' : {rest}"));
            }
            // `#version`, `#extension`, `#pragma` and friends pass through.
            _ => out.lines.push((line_no, raw.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(format!(
            "ERROR: {stage:?} stage: unterminated conditional directive"
        ));
    }
    Ok(out)
}

/// Performs the structural checks a driver would reject outright.
pub fn validate(stage: ShaderStage, source: &Preprocessed) -> Result<(), String> {
    let mut depth: i64 = 0;
    let mut has_main = false;
    for (line_no, line) in &source.lines {
        let code = line.split("//").next().unwrap_or_default();
        if code.contains("void main") {
            has_main = true;
        }
        for c in code.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!("ERROR: 0:{line_no}: '}}' : syntax error"));
            }
        }
    }
    if depth != 0 {
        return Err(format!("ERROR: {stage:?} stage: unexpected end of file, missing '}}'"));
    }
    if !has_main {
        return Err("ERROR: 'main' : function not defined".to_string());
    }
    Ok(())
}

/// Collects `uniform` declarations of known types, in declaration order.
pub fn uniforms(source: &Preprocessed) -> Vec<Declaration> {
    declarations(source, &["uniform"])
}

/// Collects vertex inputs (`in` / `attribute`), in declaration order.
pub fn vertex_inputs(source: &Preprocessed) -> Vec<Declaration> {
    declarations(source, &["in", "attribute"])
}

fn declarations(source: &Preprocessed, storage: &[&str]) -> Vec<Declaration> {
    let mut found = Vec::new();
    for (_, line) in &source.lines {
        let code = line.split("//").next().unwrap_or_default().trim();
        let Some(code) = code.strip_suffix(';') else {
            continue;
        };
        let mut words = code.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if !storage.contains(&first) {
            continue;
        }
        let mut words: Vec<&str> = words.collect();
        // Drop precision qualifiers.
        words.retain(|w| !matches!(*w, "lowp" | "mediump" | "highp"));
        let [ty, declarator] = words.as_slice() else {
            continue;
        };
        if UniformType::from_glsl(ty).is_none() {
            continue;
        }
        let (name, array_len) = match declarator.split_once('[') {
            Some((name, len)) => {
                let len = len.trim_end_matches(']').trim();
                let len = len
                    .parse::<u32>()
                    .ok()
                    .or_else(|| source.defines.get(len).and_then(|v| v.parse().ok()));
                match len {
                    Some(len) if len > 0 => (name, len),
                    _ => continue,
                }
            }
            None => (*declarator, 1),
        };
        found.push(Declaration {
            name: name.to_string(),
            ty: ty.to_string(),
            array_len,
        });
    }
    found
}

// --- Conditional expressions ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(i64),
    Op(&'static str),
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    const OPS: [&str; 12] = ["&&", "||", "==", "!=", ">=", "<=", ">", "<", "!", "(", ")", "-"];
    let mut tokens = Vec::new();
    let mut rest = expr.trim();
    while !rest.is_empty() {
        if let Some(op) = OPS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token::Op(op));
            rest = rest[op.len()..].trim_start();
            continue;
        }
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(format!("unexpected character in '{expr}'"));
        }
        let word = &rest[..end];
        tokens.push(match word.parse::<i64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Ident(word.to_string()),
        });
        rest = rest[end..].trim_start();
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    defines: &'a HashMap<String, String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, op: &'static str) -> bool {
        if self.peek() == Some(&Token::Op(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<i64, String> {
        let mut value = self.and()?;
        while self.eat("||") {
            let rhs = self.and()?;
            value = i64::from(value != 0 || rhs != 0);
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<i64, String> {
        let mut value = self.comparison()?;
        while self.eat("&&") {
            let rhs = self.comparison()?;
            value = i64::from(value != 0 && rhs != 0);
        }
        Ok(value)
    }

    fn comparison(&mut self) -> Result<i64, String> {
        let lhs = self.unary()?;
        let op = match self.peek() {
            Some(Token::Op(op @ ("==" | "!=" | ">=" | "<=" | ">" | "<"))) => *op,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.unary()?;
        Ok(i64::from(match op {
            "==" => lhs == rhs,
            "!=" => lhs != rhs,
            ">=" => lhs >= rhs,
            "<=" => lhs <= rhs,
            ">" => lhs > rhs,
            _ => lhs < rhs,
        }))
    }

    fn unary(&mut self) -> Result<i64, String> {
        if self.eat("!") {
            return Ok(i64::from(self.unary()? == 0));
        }
        if self.eat("-") {
            return Ok(-self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<i64, String> {
        let token = self.peek().cloned().ok_or("unexpected end of expression")?;
        self.pos += 1;
        match token {
            Token::Number(n) => Ok(n),
            Token::Op("(") => {
                let value = self.or()?;
                if !self.eat(")") {
                    return Err("missing ')'".to_string());
                }
                Ok(value)
            }
            Token::Ident(word) if word == "defined" => {
                let parenthesized = self.eat("(");
                let Some(Token::Ident(name)) = self.peek().cloned() else {
                    return Err("expected macro name after 'defined'".to_string());
                };
                self.pos += 1;
                if parenthesized && !self.eat(")") {
                    return Err("missing ')'".to_string());
                }
                Ok(i64::from(self.defines.contains_key(&name)))
            }
            Token::Ident(name) => Ok(self
                .defines
                .get(&name)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)),
            Token::Op(op) => Err(format!("unexpected '{op}'")),
        }
    }
}

fn evaluate(expr: &str, defines: &HashMap<String, String>) -> Result<bool, String> {
    let mut parser = Parser {
        tokens: tokenize(expr)?,
        pos: 0,
        defines,
    };
    let value = parser.or()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("trailing tokens in '{expr}'"));
    }
    Ok(value != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Preprocessed {
        preprocess(ShaderStage::Fragment, source).unwrap()
    }

    #[test]
    fn test_ifdef_selects_branches() {
        let out = run(
            "#define USE_MAP\n#ifdef USE_MAP\nuniform sampler2D map;\n\
             #else\nuniform vec3 color;\n#endif\n",
        );
        let names: Vec<_> = uniforms(&out).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["map"]);
    }

    #[test]
    fn test_nested_inactive_blocks_stay_inactive() {
        let out = run(
            "#ifdef A\n#ifdef B\nuniform float b;\n#else\nuniform float notb;\n\
             #endif\n#endif\nuniform float c;\n",
        );
        let names: Vec<_> = uniforms(&out).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["c"]);
    }

    #[test]
    fn test_if_expressions() {
        let out = run(
            "#define NUM_DIR_LIGHTS 2\n\
             #if NUM_DIR_LIGHTS > 0 && !defined(FLAT)\n\
             uniform vec3 dir[NUM_DIR_LIGHTS];\n\
             #endif\n\
             #if NUM_POINT_LIGHTS > 0\n\
             uniform vec3 point[NUM_POINT_LIGHTS];\n\
             #elif defined NUM_DIR_LIGHTS\n\
             uniform float fallback;\n\
             #endif\n",
        );
        let decls = uniforms(&out);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "dir");
        assert_eq!(decls[0].array_len, 2);
        assert_eq!(decls[1].name, "fallback");
    }

    #[test]
    fn test_error_directive_fails_with_line() {
        let source = "void main() {}\n#error broken shader\n";
        let err = preprocess(ShaderStage::Fragment, source).unwrap_err();
        assert!(err.contains("0:2"));
        assert!(err.contains("broken shader"));
    }

    #[test]
    fn test_error_in_inactive_block_is_ignored() {
        let source = "#ifdef NOPE\n#error unreachable\n#endif\n";
        assert!(preprocess(ShaderStage::Vertex, source).is_ok());
    }

    #[test]
    fn test_unterminated_conditional() {
        assert!(preprocess(ShaderStage::Vertex, "#ifdef A\n").is_err());
        assert!(preprocess(ShaderStage::Vertex, "#endif\n").is_err());
    }

    #[test]
    fn test_validate_requires_main_and_balanced_braces() {
        assert!(validate(ShaderStage::Vertex, &run("void main() { }\n")).is_ok());
        assert!(validate(ShaderStage::Vertex, &run("void other() { }\n")).is_err());
        assert!(validate(ShaderStage::Vertex, &run("void main() { \n")).is_err());
    }

    #[test]
    fn test_vertex_inputs_and_precision_qualifiers() {
        let out = run(
            "in vec3 position;\nattribute highp vec2 uv;\nuniform mediump float t;\nin Foo bar;\n",
        );
        let inputs: Vec<_> = vertex_inputs(&out).into_iter().map(|d| d.name).collect();
        assert_eq!(inputs, vec!["position", "uv"]);
        assert_eq!(uniforms(&out)[0].name, "t");
    }

    #[test]
    fn test_zero_length_arrays_are_dropped() {
        let out = run("#define N 0\nuniform vec3 lights[N];\n");
        assert!(uniforms(&out).is_empty());
    }
}
