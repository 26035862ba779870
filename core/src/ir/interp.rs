//! file: core/src/ir/interp.rs
//! description: abstract execution of reformulated IR.
//!
//! Nothing here evaluates real source code. Free names are callables,
//! calling one yields an object named after it, and protocol hooks looked
//! up on such an object are recorded as enter/exit events. A `Scenario`
//! decides which of those calls raise, which exit hooks suppress and which
//! asynchronous enters get cancelled.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::{ContractViolation, ReformErrorExt};
use crate::policy::AttributeLookupForm;

use super::node::{ExceptionComponent, IrNode, IrNodeKind, WaitKind};
use super::value::Value;

const CATCH_ALL: &str = "BaseException";
const USER_EXCEPTION: &str = "RuntimeError";
const CANCELLED: &str = "CancelledError";

/// Which abstract calls misbehave during one simulated run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    raising: HashSet<String>,
    suppressing: HashSet<String>,
    exit_raising: HashSet<String>,
    enter_raising: HashSet<String>,
    cancel_enter: HashSet<String>,
}

impl Scenario {
    pub fn new() -> Self {
        Scenario::default()
    }

    /// Calling `name` raises.
    pub fn raising(mut self, name: &str) -> Self {
        self.raising.insert(name.to_string());
        self
    }

    /// The exit hook of the manager built by `name` returns a truthy value.
    pub fn suppressing(mut self, name: &str) -> Self {
        self.suppressing.insert(name.to_string());
        self
    }

    pub fn exit_raising(mut self, name: &str) -> Self {
        self.exit_raising.insert(name.to_string());
        self
    }

    pub fn enter_raising(mut self, name: &str) -> Self {
        self.enter_raising.insert(name.to_string());
        self
    }

    /// The task is cancelled while suspended on the enter call of `name`.
    pub fn cancel_enter(mut self, name: &str) -> Self {
        self.cancel_enter.insert(name.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimException {
    pub class: String,
    pub origin: String,
}

impl fmt::Display for SimException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.class, self.origin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimValue {
    Const(Value),
    /// Result of calling a user callable, named after it.
    Object(String),
    Callable(String),
    Hook { owner: String, hook: String },
    Tuple(Vec<SimValue>),
    ExceptionPart { component: ExceptionComponent, class: String },
}

impl SimValue {
    fn is_truthy(&self) -> bool {
        match self {
            SimValue::Const(value) => value.is_truthy(),
            SimValue::Tuple(items) => !items.is_empty(),
            _ => true,
        }
    }

    fn name(&self) -> String {
        match self {
            SimValue::Object(name) | SimValue::Callable(name) => name.clone(),
            SimValue::Hook { owner, hook } => format!("{}.{}", owner, hook),
            SimValue::Const(value) => value.to_string(),
            SimValue::Tuple(_) => "tuple".to_string(),
            SimValue::ExceptionPart { class, .. } => class.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    Call(String),
    Lookup {
        owner: String,
        attribute: String,
        form: AttributeLookupForm,
    },
    Enter(String),
    Exit { owner: String, with_exception: bool },
    Suspend(WaitKind),
    Raise(SimException),
    Assign(String),
    AssignTemp(String),
    Release { temp: String, was_assigned: bool },
    Reraise(SimException),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Call(name) => write!(f, "call {}", name),
            Event::Lookup { owner, attribute, form } => match form {
                AttributeLookupForm::Plain => write!(f, "lookup {}.{}", owner, attribute),
                AttributeLookupForm::Special => write!(f, "lookup-special {}.{}", owner, attribute),
            },
            Event::Enter(owner) => write!(f, "enter {}", owner),
            Event::Exit { owner, with_exception } => {
                if *with_exception {
                    write!(f, "exit {} (exception)", owner)
                } else {
                    write!(f, "exit {} (none)", owner)
                }
            }
            Event::Suspend(wait) => write!(f, "suspend {:?}", wait),
            Event::Raise(exc) => write!(f, "raise {}", exc),
            Event::Assign(name) => write!(f, "assign {}", name),
            Event::AssignTemp(name) => write!(f, "assign-temp {}", name),
            Event::Release { temp, was_assigned } => {
                if *was_assigned {
                    write!(f, "release {}", temp)
                } else {
                    write!(f, "release {} (unassigned)", temp)
                }
            }
            Event::Reraise(exc) => write!(f, "reraise {}", exc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Completed,
    Raised(SimException),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub events: Vec<Event>,
    pub outcome: Outcome,
}

impl Trace {
    pub fn exits(&self, owner: &str) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Exit { owner: o, with_exception } if o == owner => Some(*with_exception),
                _ => None,
            })
            .collect()
    }

    pub fn enters(&self, owner: &str) -> usize {
        self.count(|e| matches!(e, Event::Enter(o) if o == owner))
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Position of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    pub fn releases_of(&self, qualified_name: &str) -> usize {
        self.count(|e| matches!(e, Event::Release { temp, .. } if temp == qualified_name))
    }

    pub fn suspensions(&self) -> Vec<WaitKind> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Suspend(wait) => Some(*wait),
                _ => None,
            })
            .collect()
    }

    pub fn reraised(&self) -> bool {
        self.events.iter().any(|e| matches!(e, Event::Reraise(_)))
    }

    pub fn raised(&self) -> Option<&SimException> {
        match &self.outcome {
            Outcome::Raised(exc) => Some(exc),
            Outcome::Completed => None,
        }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, event) in self.events.iter().enumerate() {
            writeln!(f, "{:>4}  {}", i, event)?;
        }
        match &self.outcome {
            Outcome::Completed => write!(f, "outcome: completed"),
            Outcome::Raised(exc) => write!(f, "outcome: raised {}", exc),
        }
    }
}

enum Flow {
    Raise(SimException),
    Fault(Box<dyn ReformErrorExt>),
}

type Step<T> = Result<T, Flow>;

struct Machine<'s> {
    scenario: &'s Scenario,
    events: Vec<Event>,
    temps: HashMap<usize, SimValue>,
    variables: HashMap<String, SimValue>,
    handling: Vec<SimException>,
    last_enter: Option<String>,
}

fn fault(node: &IrNode, message: String) -> Flow {
    Flow::Fault(ContractViolation::new(message, "reform.interp.simulate", Some(node.location.clone())).into())
}

fn is_hook(attribute: &str) -> bool {
    matches!(attribute, "__enter__" | "__exit__" | "__aenter__" | "__aexit__")
}

impl<'s> Machine<'s> {
    fn raise(&mut self, class: &str, origin: String) -> Flow {
        let exc = SimException {
            class: class.to_string(),
            origin,
        };
        self.events.push(Event::Raise(exc.clone()));
        Flow::Raise(exc)
    }

    fn exec(&mut self, node: &IrNode) -> Step<()> {
        match &node.kind {
            IrNodeKind::Sequence { statements } => {
                for statement in statements {
                    self.exec(statement)?;
                }
                Ok(())
            }
            IrNodeKind::AssignTemp { variable, source } => {
                let value = self.eval(source)?;
                self.events.push(Event::AssignTemp(variable.qualified_name()));
                self.temps.insert(variable.id, value);
                Ok(())
            }
            IrNodeKind::AssignVariable { name, source } => {
                let value = self.eval(source)?;
                self.events.push(Event::Assign(name.clone()));
                self.variables.insert(name.clone(), value);
                Ok(())
            }
            IrNodeKind::AssignAttribute {
                object,
                attribute,
                source,
            } => {
                self.eval(source)?;
                let target = self.eval(object)?;
                self.events.push(Event::Assign(format!("{}.{}", target.name(), attribute)));
                Ok(())
            }
            IrNodeKind::ExpressionOnly { expression } => self.eval(expression).map(|_| ()),
            IrNodeKind::Conditional {
                condition,
                yes_branch,
                no_branch,
            } => {
                let branch = if self.eval(condition)?.is_truthy() {
                    yes_branch
                } else {
                    no_branch
                };
                match branch {
                    Some(branch) => self.exec(branch),
                    None => Ok(()),
                }
            }
            IrNodeKind::TryFinally { tried, final_branch } => {
                let result = self.exec(tried);
                if let Err(Flow::Fault(_)) = result {
                    return result;
                }
                // an exception leaving the final branch replaces the pending one
                self.exec(final_branch)?;
                result
            }
            IrNodeKind::TryExcept {
                tried,
                exception_name,
                handler,
                ..
            } => match self.exec(tried) {
                Err(Flow::Raise(exc)) if exception_name == CATCH_ALL || *exception_name == exc.class => {
                    self.handling.push(exc);
                    let result = self.exec(handler);
                    self.handling.pop();
                    result
                }
                other => other,
            },
            IrNodeKind::Reraise => match self.handling.last().cloned() {
                Some(exc) => {
                    self.events.push(Event::Reraise(exc.clone()));
                    Err(Flow::Raise(exc))
                }
                None => Err(fault(node, "re-raise outside of an exception handler".to_string())),
            },
            IrNodeKind::Release { variable } => {
                let was_assigned = self.temps.remove(&variable.id).is_some();
                self.events.push(Event::Release {
                    temp: variable.qualified_name(),
                    was_assigned,
                });
                Ok(())
            }
            _ => Err(fault(node, format!("{} used as a statement", node.label()))),
        }
    }

    fn eval(&mut self, node: &IrNode) -> Step<SimValue> {
        match &node.kind {
            IrNodeKind::Constant { value } => Ok(SimValue::Const(value.clone())),
            IrNodeKind::TempRef { variable } => match self.temps.get(&variable.id) {
                Some(value) => Ok(value.clone()),
                None => Err(fault(node, format!("temp {} read before assignment", variable))),
            },
            IrNodeKind::VariableRef { name } => Ok(self
                .variables
                .get(name)
                .cloned()
                .unwrap_or_else(|| SimValue::Callable(name.clone()))),
            IrNodeKind::AttributeLookup {
                expression,
                attribute,
                form,
            } => {
                let owner = self.eval(expression)?.name();
                self.events.push(Event::Lookup {
                    owner: owner.clone(),
                    attribute: attribute.clone(),
                    form: *form,
                });
                if is_hook(attribute) {
                    Ok(SimValue::Hook {
                        owner,
                        hook: attribute.clone(),
                    })
                } else {
                    Ok(SimValue::Callable(format!("{}.{}", owner, attribute)))
                }
            }
            IrNodeKind::Call { called, args } => {
                let called = self.eval(called)?;
                let args = match args {
                    Some(args) => Some(self.eval(args)?),
                    None => None,
                };
                self.call(node, called, args)
            }
            IrNodeKind::MakeTuple { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element)?);
                }
                Ok(SimValue::Tuple(values))
            }
            IrNodeKind::CaughtException { component } => match self.handling.last() {
                Some(exc) => Ok(SimValue::ExceptionPart {
                    component: *component,
                    class: exc.class.clone(),
                }),
                None => Err(fault(node, "caught exception read outside of a handler".to_string())),
            },
            IrNodeKind::ComparisonIs { left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(SimValue::Const(Value::Bool(left == right)))
            }
            IrNodeKind::Suspend { expression, wait } => {
                let value = self.eval(expression)?;
                self.events.push(Event::Suspend(*wait));
                if *wait == WaitKind::Enter {
                    if let Some(owner) = self.last_enter.clone() {
                        if self.scenario.cancel_enter.contains(&owner) {
                            return Err(self.raise(CANCELLED, format!("{} enter", owner)));
                        }
                    }
                }
                Ok(value)
            }
            _ => Err(fault(node, format!("{} used as an expression", node.label()))),
        }
    }

    fn call(&mut self, node: &IrNode, called: SimValue, args: Option<SimValue>) -> Step<SimValue> {
        match called {
            SimValue::Hook { owner, hook } if hook == "__enter__" || hook == "__aenter__" => {
                self.events.push(Event::Enter(owner.clone()));
                self.last_enter = Some(owner.clone());
                if self.scenario.enter_raising.contains(&owner) {
                    return Err(self.raise(USER_EXCEPTION, format!("{}.{}", owner, hook)));
                }
                Ok(SimValue::Object(owner))
            }
            SimValue::Hook { owner, hook } => {
                let with_exception = match &args {
                    Some(SimValue::Tuple(items)) => {
                        matches!(items.first(), Some(SimValue::ExceptionPart { .. }))
                    }
                    Some(SimValue::Const(Value::Tuple(items))) => !matches!(items.first(), Some(Value::None)),
                    _ => {
                        return Err(fault(node, format!("exit hook of {} called without three arguments", owner)));
                    }
                };
                self.events.push(Event::Exit {
                    owner: owner.clone(),
                    with_exception,
                });
                if self.scenario.exit_raising.contains(&owner) {
                    return Err(self.raise(USER_EXCEPTION, format!("{}.{}", owner, hook)));
                }
                Ok(SimValue::Const(Value::Bool(self.scenario.suppressing.contains(&owner))))
            }
            SimValue::Callable(name) | SimValue::Object(name) => {
                self.events.push(Event::Call(name.clone()));
                if self.scenario.raising.contains(&name) {
                    return Err(self.raise(USER_EXCEPTION, name));
                }
                Ok(SimValue::Object(name))
            }
            other => Err(fault(node, format!("{} is not callable", other.name()))),
        }
    }
}

/// Run `node` under `scenario` and record what happened.
///
/// Source-level exceptions end up in the trace outcome; only malformed IR is
/// reported as an error.
pub fn simulate(node: &IrNode, scenario: &Scenario) -> Result<Trace, Box<dyn ReformErrorExt>> {
    let mut machine = Machine {
        scenario,
        events: Vec::new(),
        temps: HashMap::new(),
        variables: HashMap::new(),
        handling: Vec::new(),
        last_enter: None,
    };
    let outcome = match machine.exec(node) {
        Ok(()) => Outcome::Completed,
        Err(Flow::Raise(exc)) => Outcome::Raised(exc),
        Err(Flow::Fault(err)) => return Err(err),
    };
    log::trace!("simulation finished with {} event(s)", machine.events.len());
    Ok(Trace {
        events: machine.events,
        outcome,
    })
}

/// Run a sequence of top-level statements as one program.
pub fn simulate_all(body: &[IrNode], scenario: &Scenario) -> Result<Trace, Box<dyn ReformErrorExt>> {
    let location = body.first().map(|n| n.location.clone()).unwrap_or_default();
    let program = IrNode::new(
        IrNodeKind::Sequence {
            statements: body.to_vec(),
        },
        location,
    );
    simulate(&program, scenario)
}
