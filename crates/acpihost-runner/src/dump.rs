//! Diagnostic namespace dump.

use acpihost_interp::{Interpreter, ObjectType};

/// Print every namespace node, indented by depth.
pub(crate) fn namespace<I: Interpreter>(interp: &I) {
    interp.for_each_node(&mut |node| {
        let indent = node.depth as usize * 4;
        match (node.object_type, node.method_args) {
            (ObjectType::Method, Some(args)) => {
                println!("{:indent$}{} [{}] ({args} args)", "", node.path, node.object_type);
            }
            _ => println!("{:indent$}{} [{}]", "", node.path, node.object_type),
        }
    });
}
