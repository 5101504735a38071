use super::instr::{Instr, Label, MethodBody};
use crate::{
    err::{CompileError, Result},
    parse::ast::Ty,
};

/// Collects the instructions of one method body.
#[derive(Debug, Default)]
pub struct Emitter {
    code: Vec<Instr>,
    labels: Vec<Option<usize>>,
    locals: Vec<Ty>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instr: Instr) {
        log::trace!("IL_{:04}: {}", self.code.len(), instr);
        self.code.push(instr);
    }

    pub fn define_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Binds `label` to the next emitted instruction.
    pub fn mark_label(&mut self, label: Label) {
        if let Some(slot) = self.labels.get_mut(label.0 as usize) {
            *slot = Some(self.code.len());
        }
    }

    pub fn declare_local(&mut self, ty: Ty) -> u16 {
        self.locals.push(ty);
        self.locals.len() as u16 - 1
    }

    pub fn finish(self) -> Result<MethodBody> {
        let labels = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, l)| l.ok_or(CompileError::UnmarkedLabel(i as u32)))
            .collect::<Result<Vec<_>>>()?;

        Ok(MethodBody {
            code: self.code,
            labels,
            locals: self.locals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_to_offsets() {
        let mut il = Emitter::new();
        let end = il.define_label();
        il.emit(Instr::Br(end));
        il.emit(Instr::LdcI4(0));
        il.mark_label(end);
        il.emit(Instr::Ret);

        let body = il.finish().unwrap();
        assert_eq!(body.target(end), Some(2));
    }

    #[test]
    fn unmarked_label_fails() {
        let mut il = Emitter::new();
        let _ = il.define_label();
        let l = il.define_label();
        il.mark_label(l);
        assert_eq!(il.finish(), Err(CompileError::UnmarkedLabel(0)));
    }
}
