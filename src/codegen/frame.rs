//! Stack-map frames recorded per label, and their merge rules

use crate::types::{StackKind, TypeDesc};

use super::code::Label;
use super::descriptor::class_name;
use super::error::{StackError, StackResult};

/// Verification types of the target's stack-map frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    Object(String),
}

impl VerificationType {
    pub fn of(ty: &TypeDesc) -> Self {
        match ty.stack_kind() {
            None => VerificationType::Top,
            Some(StackKind::Int) => VerificationType::Integer,
            Some(StackKind::Long) => VerificationType::Long,
            Some(StackKind::Float) => VerificationType::Float,
            Some(StackKind::Double) => VerificationType::Double,
            Some(StackKind::Ref) => match ty {
                TypeDesc::Null => VerificationType::Null,
                other => VerificationType::Object(class_name(other)),
            },
        }
    }
}

/// Snapshot of the operand stack and tracked locals at a label
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub stack: Vec<TypeDesc>,
    /// Indexed by slot; `None` is an unset slot or the upper half of a category-2 value
    pub locals: Vec<Option<TypeDesc>>,
}

impl Frame {
    pub fn new(stack: Vec<TypeDesc>, locals: Vec<Option<TypeDesc>>) -> Self {
        Self { stack, locals }
    }

    /// Merge an incoming state into this frame. Stacks must agree in depth and
    /// kind; locals that disagree become unusable.
    pub fn merge_with(&mut self, label: Label, incoming: &Frame) -> StackResult<()> {
        let mismatch = || StackError::FrameMismatch {
            label,
            recorded: self.stack.clone(),
            incoming: incoming.stack.clone(),
        };
        if self.stack.len() != incoming.stack.len() {
            return Err(mismatch());
        }
        let mut merged = Vec::with_capacity(self.stack.len());
        for (a, b) in self.stack.iter().zip(&incoming.stack) {
            match merge_type(a, b) {
                Some(t) => merged.push(t),
                None => return Err(mismatch()),
            }
        }
        self.stack = merged;

        let len = self.locals.len().max(incoming.locals.len());
        for slot in 0..len {
            let a = self.locals.get(slot).cloned().flatten();
            let b = incoming.locals.get(slot).cloned().flatten();
            let merged = match (a, b) {
                (Some(a), Some(b)) => merge_type(&a, &b),
                _ => None,
            };
            if slot < self.locals.len() {
                self.locals[slot] = merged;
            } else {
                self.locals.push(merged);
            }
        }
        Ok(())
    }

    pub fn verification_stack(&self) -> Vec<VerificationType> {
        self.stack.iter().map(VerificationType::of).collect()
    }

    pub fn verification_locals(&self) -> Vec<VerificationType> {
        self.locals
            .iter()
            .map(|l| l.as_ref().map(VerificationType::of).unwrap_or(VerificationType::Top))
            .collect()
    }
}

/// Least common type of two values meeting at a merge point.
///
/// Equal types merge to themselves; values of the same primitive stack kind
/// keep the first type; null merges into any reference; two distinct
/// references merge to the erased object type. Anything else does not merge.
pub fn merge_type(a: &TypeDesc, b: &TypeDesc) -> Option<TypeDesc> {
    if a == b {
        return Some(a.clone());
    }
    match (a.stack_kind()?, b.stack_kind()?) {
        (StackKind::Ref, StackKind::Ref) => match (a, b) {
            (TypeDesc::Null, other) | (other, TypeDesc::Null) => Some(other.clone()),
            _ if class_name(a) == class_name(b) => Some(a.clone()),
            _ => Some(TypeDesc::object()),
        },
        (ka, kb) if ka == kb => Some(a.clone()),
        _ => None,
    }
}

/// Human-readable frame listing, one line per label
pub fn describe_frames<'a>(frames: impl IntoIterator<Item = (&'a Label, &'a Frame)>) -> Vec<String> {
    frames
        .into_iter()
        .map(|(label, frame)| {
            format!(
                "{} locals={:?} stack={:?}",
                label,
                frame.verification_locals(),
                frame.verification_stack()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn test_merge_object_and_null() {
        let s = TypeDesc::string();
        assert_eq!(merge_type(&s, &TypeDesc::Null), Some(s.clone()));
        assert_eq!(merge_type(&TypeDesc::Null, &s), Some(s));
    }

    #[test]
    fn test_merge_distinct_objects_to_object() {
        let merged = merge_type(&TypeDesc::string(), &TypeDesc::named("Foo"));
        assert_eq!(merged, Some(TypeDesc::object()));
    }

    #[test]
    fn test_merge_primitive_mismatch() {
        assert_eq!(merge_type(&TypeDesc::I32, &TypeDesc::I64), None);
        assert_eq!(merge_type(&TypeDesc::I32, &TypeDesc::object()), None);
        assert_eq!(
            merge_type(&TypeDesc::I32, &TypeDesc::Primitive(Primitive::U8)),
            Some(TypeDesc::I32)
        );
    }

    #[test]
    fn test_frame_merge_rejects_depth_change() {
        let mut recorded = Frame::new(vec![TypeDesc::I32], vec![]);
        let incoming = Frame::new(vec![], vec![]);
        assert!(matches!(
            recorded.merge_with(Label(3), &incoming),
            Err(StackError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn test_frame_merge_drops_disagreeing_locals() {
        let mut recorded = Frame::new(vec![], vec![Some(TypeDesc::I32), Some(TypeDesc::string())]);
        let incoming = Frame::new(vec![], vec![Some(TypeDesc::F32), Some(TypeDesc::Null)]);
        recorded.merge_with(Label(0), &incoming).unwrap();
        assert_eq!(recorded.locals, vec![None, Some(TypeDesc::string())]);
        assert_eq!(
            recorded.verification_locals(),
            vec![VerificationType::Top, VerificationType::Object("java/lang/String".into())]
        );
    }
}
