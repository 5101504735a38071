use std::collections::HashMap;

#[derive(Default)]
pub struct Interner {
    map: HashMap<Box<str>, u32>,
    names: Vec<Box<str>>,
}

impl Interner {
    pub fn intern(&mut self, name: &str) -> super::Symbol {
        if let Some(&idx) = self.map.get(name) {
            return super::Symbol(idx);
        }

        let idx = self.names.len() as u32;
        self.names.push(name.into());
        self.map.insert(name.into(), idx);
        super::Symbol(idx)
    }

    pub fn lookup(&self, idx: u32) -> &str {
        &self.names[idx as usize]
    }
}
