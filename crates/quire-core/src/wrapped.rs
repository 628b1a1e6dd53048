//! An operation paired with metadata that travels with it through
//! invert, compose and transform.

use crate::edit::Edit;
use crate::error::Result;
use crate::meta::Meta;
use crate::operation::Operation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WrappedOperation<M> {
    pub operation: Operation,
    pub meta: M,
}

impl<M: Meta> WrappedOperation<M> {
    pub fn new(operation: Operation, meta: M) -> Self {
        Self { operation, meta }
    }

    pub fn into_parts(self) -> (Operation, M) {
        (self.operation, self.meta)
    }
}

impl<M: Meta> Edit for WrappedOperation<M> {
    fn operation(&self) -> &Operation {
        &self.operation
    }

    fn invert(&self, doc: &str) -> Result<Self> {
        Ok(Self::new(self.operation.invert(doc)?, self.meta.invert(doc)))
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Ok(Self::new(
            self.operation.compose(&other.operation)?,
            self.meta.compose(&other.meta),
        ))
    }

    fn transform(a: &Self, b: &Self) -> Result<(Self, Self)> {
        let (a_prime, b_prime) = Operation::transform(&a.operation, &b.operation)?;
        Ok((
            Self::new(a_prime, a.meta.transform(&b.operation)),
            Self::new(b_prime, b.meta.transform(&a.operation)),
        ))
    }

    fn transform_with(&self, other: &Operation) -> Result<(Self, Operation)> {
        let (a_prime, other_prime) = Operation::transform(&self.operation, other)?;
        Ok((Self::new(a_prime, self.meta.transform(other)), other_prime))
    }
}
