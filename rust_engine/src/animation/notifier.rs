//! 变更通知
//!
//! 监听器在修改操作的调用栈上同步执行。分发按显式下标遍历，
//! 回调内部可以增删监听器（包括移除自身），删除时会修正正在进行的分发下标。

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// 监听器句柄，由 [`ChangeNotifier::add`] 返回
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback = Rc<RefCell<Box<dyn FnMut()>>>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    listeners: Vec<(ListenerId, Callback)>,
    /// 每层进行中的分发各自的“下一个”下标（回调里再次修改路径会嵌套分发）
    cursors: Vec<usize>,
}

/// 监听器列表，克隆得到的是同一列表的句柄
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    inner: Rc<RefCell<Inner>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, callback: F) -> ListenerId
    where
        F: FnMut() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner
            .listeners
            .push((id, Rc::new(RefCell::new(Box::new(callback)))));
        id
    }

    /// 移除监听器，返回是否找到
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.listeners.iter().position(|(lid, _)| *lid == id) else {
            return false;
        };
        inner.listeners.remove(index);
        for cursor in inner.cursors.iter_mut() {
            if index < *cursor {
                *cursor -= 1;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依次调用全部监听器
    pub fn notify(&self) {
        let depth = {
            let mut inner = self.inner.borrow_mut();
            inner.cursors.push(0);
            inner.cursors.len() - 1
        };

        loop {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                let index = inner.cursors[depth];
                let Some((_, callback)) = inner.listeners.get(index) else {
                    break;
                };
                let callback = Rc::clone(callback);
                inner.cursors[depth] = index + 1;
                callback
            };

            // 嵌套分发中已在执行的回调跳过
            let Ok(mut guard) = callback.try_borrow_mut() else {
                continue;
            };
            let f: &mut dyn FnMut() = &mut **guard;
            f();
        }

        self.inner.borrow_mut().cursors.pop();
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ChangeNotifier")
            .field("listeners", &inner.listeners.len())
            .field("dispatching", &!inner.cursors.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_notify_in_order() {
        let notifier = ChangeNotifier::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            notifier.add(move || log.borrow_mut().push(i));
        }
        notifier.notify();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_returns_found() {
        let notifier = ChangeNotifier::new();
        let id = notifier.add(|| {});
        assert!(notifier.remove(id));
        assert!(!notifier.remove(id));
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_self_removal_during_dispatch() {
        let notifier = ChangeNotifier::new();
        let calls = Rc::new(Cell::new(0));
        let after = Rc::new(Cell::new(0));

        let own_id = Rc::new(Cell::new(None));
        {
            let handle = notifier.clone();
            let calls = Rc::clone(&calls);
            let slot = Rc::clone(&own_id);
            let id = notifier.add(move || {
                calls.set(calls.get() + 1);
                if let Some(id) = slot.get() {
                    handle.remove(id);
                }
            });
            own_id.set(Some(id));
        }
        {
            let after = Rc::clone(&after);
            notifier.add(move || after.set(after.get() + 1));
        }

        notifier.notify();
        // 移除自身后，后一个监听器仍被调用
        assert_eq!(calls.get(), 1);
        assert_eq!(after.get(), 1);
        assert_eq!(notifier.len(), 1);

        notifier.notify();
        assert_eq!(calls.get(), 1);
        assert_eq!(after.get(), 2);
    }

    #[test]
    fn test_remove_later_listener_during_dispatch() {
        let notifier = ChangeNotifier::new();
        let hit = Rc::new(Cell::new(false));
        let victim = Rc::new(Cell::new(None));
        {
            let handle = notifier.clone();
            let victim = Rc::clone(&victim);
            notifier.add(move || {
                if let Some(id) = victim.get() {
                    handle.remove(id);
                }
            });
        }
        {
            let hit = Rc::clone(&hit);
            let id = notifier.add(move || hit.set(true));
            victim.set(Some(id));
        }

        notifier.notify();
        assert!(!hit.get());
    }

    #[test]
    fn test_nested_notify_skips_running_callback() {
        let notifier = ChangeNotifier::new();
        let outer = Rc::new(Cell::new(0));
        let inner_calls = Rc::new(Cell::new(0));
        {
            let handle = notifier.clone();
            let outer = Rc::clone(&outer);
            notifier.add(move || {
                outer.set(outer.get() + 1);
                if outer.get() == 1 {
                    handle.notify();
                }
            });
        }
        {
            let inner_calls = Rc::clone(&inner_calls);
            notifier.add(move || inner_calls.set(inner_calls.get() + 1));
        }

        notifier.notify();
        assert_eq!(outer.get(), 1);
        // 嵌套分发一次 + 外层分发一次
        assert_eq!(inner_calls.get(), 2);
    }
}
