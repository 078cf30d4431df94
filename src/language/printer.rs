use crate::language::ast::*;

/// Renders statements in a parenthesized prefix form, one statement per line.
pub fn print_program(statements: &[Stmt]) -> String {
    let mut out = String::new();
    for statement in statements {
        out.push_str(&print_stmt(statement));
        out.push('\n');
    }
    out
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(expr) => print_expr(expr),
        Stmt::Print(values) => {
            let mut out = String::from("(print");
            for value in values {
                out.push(' ');
                out.push_str(&print_expr(value));
            }
            out.push(')');
            out
        }
        Stmt::Var(var) => match &var.initializer {
            Some(initializer) => {
                format!("(var {} {})", var.name.lexeme, print_expr(initializer))
            }
            None => format!("var {}", var.name.lexeme),
        },
        Stmt::Block(statements) => {
            let mut out = String::from("(block\n");
            for statement in statements {
                out.push_str("  ");
                out.push_str(&print_stmt(statement));
                out.push('\n');
            }
            out.push(')');
            out
        }
        Stmt::If(stmt) => {
            let mut out = format!(
                "(if {} {}",
                print_expr(&stmt.condition),
                print_stmt(&stmt.then_branch)
            );
            if let Some(else_branch) = &stmt.else_branch {
                out.push(' ');
                out.push_str(&print_stmt(else_branch));
            }
            out.push(')');
            out
        }
        Stmt::While(stmt) => format!(
            "(while {} {})",
            print_expr(&stmt.condition),
            print_stmt(&stmt.body)
        ),
        Stmt::For(stmt) => {
            let mut out = String::from("(for");
            if let Some(initializer) = &stmt.initializer {
                out.push(' ');
                out.push_str(&print_stmt(initializer));
            }
            out.push(' ');
            out.push_str(&print_expr(&stmt.condition));
            if let Some(increment) = &stmt.increment {
                out.push(' ');
                out.push_str(&print_expr(increment));
            }
            out.push(' ');
            out.push_str(&print_stmt(&stmt.body));
            out.push(')');
            out
        }
        Stmt::Break(_) => "break".to_string(),
        Stmt::Continue(_) => "continue".to_string(),
        Stmt::Return(stmt) => match &stmt.value {
            Some(value) => format!("(return {})", print_expr(value)),
            None => "(return)".to_string(),
        },
        Stmt::Function(decl) => format!("(fun {})", decl.name.lexeme),
        Stmt::Class(class) => format!("(class {})", class.name.lexeme),
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(value) => value.to_string(),
        Expr::Grouping(inner) => format!("(group {})", print_expr(inner)),
        Expr::Variable(var) => var.name.lexeme.clone(),
        Expr::Assign(assign) => {
            format!("({} {})", assign.name.lexeme, print_expr(&assign.value))
        }
        Expr::Unary(unary) => format!("({} {})", unary.op.lexeme, print_expr(&unary.right)),
        Expr::Binary(binary) => format!(
            "({} {} {})",
            binary.op.lexeme,
            print_expr(&binary.left),
            print_expr(&binary.right)
        ),
        Expr::Logical(logical) => format!(
            "({} {} {})",
            logical.op.lexeme,
            print_expr(&logical.left),
            print_expr(&logical.right)
        ),
        Expr::Ternary(ternary) => format!(
            "(? {} {} {})",
            print_expr(&ternary.condition),
            print_expr(&ternary.on_true),
            print_expr(&ternary.on_false)
        ),
        Expr::Call(call) => {
            let mut out = format!("(call {}", print_expr(&call.callee));
            for arg in &call.args {
                out.push(' ');
                out.push_str(&print_expr(arg));
            }
            out.push(')');
            out
        }
        Expr::Get(get) => format!("(get {} {})", get.name.lexeme, print_expr(&get.object)),
        Expr::Set(set) => format!(
            "(set {} {} {})",
            set.name.lexeme,
            print_expr(&set.object),
            print_expr(&set.value)
        ),
        Expr::This(keyword) => keyword.lexeme.clone(),
        Expr::Super(sup) => format!("({} {})", sup.keyword.lexeme, sup.method.lexeme),
        Expr::Array(array) => {
            let mut out = String::from("(array");
            for value in &array.values {
                out.push(' ');
                out.push_str(&print_expr(value));
            }
            out.push(')');
            out
        }
        Expr::ArrayGet(get) => format!(
            "([get] {} {})",
            print_expr(&get.array),
            print_expr(&get.index)
        ),
        Expr::ArraySet(set) => format!(
            "([set] {} {} {})",
            print_expr(&set.array),
            print_expr(&set.index),
            print_expr(&set.value)
        ),
    }
}
