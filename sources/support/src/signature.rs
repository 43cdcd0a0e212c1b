//! Remapping of generic signatures (JVMS §4.7.9.1).
//!
//! Signatures are a superset of descriptors: type variables (`TT;`), type
//! arguments (`<...>`), wildcards and inner class suffixes (`.Inner`) all
//! need to survive a rename untouched, with only the class names changed.

use anyhow::{anyhow, Result};

/// Remap the class names inside a class, method or field signature.
/// `map` returns `None` for classes that keep their name.
pub fn remap_signature(signature: &str, map: &impl Fn(&str) -> Option<String>) -> Result<String> {
    let remapper = SignatureRemapper {
        source: signature,
        chars: signature.chars().collect(),
        pos: 0,
        out: String::with_capacity(signature.len()),
        map,
    };

    remapper.run()
}

struct SignatureRemapper<'a, F> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    out: String,
    map: &'a F,
}

impl<'a, F> SignatureRemapper<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn run(mut self) -> Result<String> {
        if self.peek() == Some('<') {
            self.formal_type_parameters()?;
        }

        if self.peek() == Some('(') {
            self.expect('(')?;
            while self.peek_required()? != ')' {
                self.java_type()?;
            }
            self.expect(')')?;

            // Return type, may be V
            self.java_type()?;

            while self.peek() == Some('^') {
                self.expect('^')?;
                self.java_type()?;
            }
        } else {
            // Class signatures list the superclass then each interface,
            // field signatures are a single type
            while self.peek().is_some() {
                self.java_type()?;
            }
        }

        Ok(self.out)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_required(&self) -> Result<char> {
        self.peek()
            .ok_or(anyhow!("signature {:?} ended unexpectedly", self.source))
    }

    fn bump(&mut self) -> Result<char> {
        let c = self.peek_required()?;
        self.pos += 1;
        Ok(c)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        let c = self.bump()?;
        if c != expected {
            return Err(anyhow!(
                "signature {:?}: expected '{}' at {} but found '{}'",
                self.source,
                expected,
                self.pos - 1,
                c
            ));
        }

        self.out.push(c);
        Ok(())
    }

    fn copy_until(&mut self, stops: &[char]) -> Result<String> {
        let mut ident = String::new();
        while !stops.contains(&self.peek_required()?) {
            ident.push(self.bump()?);
        }
        Ok(ident)
    }

    fn formal_type_parameters(&mut self) -> Result<()> {
        self.expect('<')?;

        while self.peek_required()? != '>' {
            let ident = self.copy_until(&[':'])?;
            if ident.is_empty() {
                return Err(anyhow!("signature {:?} has an unnamed type parameter", self.source));
            }
            self.out.push_str(&ident);

            // Class bound, which may be empty
            self.expect(':')?;
            if matches!(self.peek_required()?, 'L' | 'T' | '[') {
                self.java_type()?;
            }

            // Interface bounds
            while self.peek() == Some(':') {
                self.expect(':')?;
                self.java_type()?;
            }
        }

        self.expect('>')
    }

    fn java_type(&mut self) -> Result<()> {
        match self.peek_required()? {
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 'V' => {
                let c = self.bump()?;
                self.out.push(c);
                Ok(())
            }
            '[' => {
                self.expect('[')?;
                self.java_type()
            }
            'T' => {
                self.expect('T')?;
                let variable = self.copy_until(&[';'])?;
                self.out.push_str(&variable);
                self.expect(';')
            }
            'L' => self.class_type(),
            c => Err(anyhow!(
                "signature {:?}: unexpected '{}' at {}",
                self.source,
                c,
                self.pos
            )),
        }
    }

    fn class_type(&mut self) -> Result<()> {
        self.expect('L')?;

        let mut old_name = self.copy_until(&['<', '.', ';'])?;
        let mut new_name = (self.map)(&old_name).unwrap_or_else(|| old_name.clone());
        self.out.push_str(&new_name);

        if self.peek_required()? == '<' {
            self.type_arguments()?;
        }

        while self.peek_required()? == '.' {
            self.expect('.')?;
            let inner = self.copy_until(&['<', '.', ';'])?;

            let outer_prefix = format!("{}$", new_name);
            old_name = format!("{}${}", old_name, inner);
            new_name = (self.map)(&old_name).unwrap_or_else(|| old_name.clone());

            // Emit only the simple name, the outer part is already written
            let simple = match new_name.strip_prefix(&outer_prefix) {
                Some(simple) => simple,
                None => new_name.rsplit('$').next().unwrap_or(&new_name),
            };
            self.out.push_str(simple);

            if self.peek_required()? == '<' {
                self.type_arguments()?;
            }
        }

        self.expect(';')
    }

    fn type_arguments(&mut self) -> Result<()> {
        self.expect('<')?;

        while self.peek_required()? != '>' {
            match self.peek_required()? {
                '*' => self.expect('*')?,
                '+' => {
                    self.expect('+')?;
                    self.java_type()?;
                }
                '-' => {
                    self.expect('-')?;
                    self.java_type()?;
                }
                _ => self.java_type()?,
            }
        }

        self.expect('>')
    }
}
