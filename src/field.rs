//! Field accessor: read a named attribute of a foreign object.

use crate::error::{BridgeError, BridgeResult};
use crate::handle::Handle;
use crate::interpreter::Interpreter;
use crate::marshal::{FromForeign, coerce};
use crate::runtime::ExceptionKind;

impl Interpreter {
    /// `getattr(obj, field)` coerced to `R`.
    ///
    /// A missing attribute is `BridgeError::Attribute`; a value that does not
    /// fit `R` is `BridgeError::Type`.
    pub fn get_field<R: FromForeign>(&self, field: &str, handle: Handle) -> BridgeResult<R> {
        let value = self.with_session(|session| {
            let obj = session.lookup(handle)?;
            let attr = match session.runtime.getattr(obj, field) {
                Ok(attr) => attr,
                Err(e) if e.kind == ExceptionKind::AttributeError => {
                    return Err(BridgeError::Attribute {
                        name: field.to_string(),
                        type_name: session.runtime.type_name(obj),
                    });
                }
                Err(e) => return Err(BridgeError::foreign(field, e)),
            };
            let value = coerce(session, attr, R::TAG);
            session.runtime.decref(attr);
            value
        })?;
        R::from_host(value)
    }
}
