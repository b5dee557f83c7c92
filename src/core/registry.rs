use crate::domain::model::ServiceInstance;
use crate::utils::error::{BrokerError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Slot {
    /// Provision 已開始、尚未收到 provider 回應
    Provisioning,
    Ready(ServiceInstance),
}

/// instance id → 已建立資源的對照表。所有讀寫都經過同一把鎖，
/// 鎖不會跨越 await（provider 呼叫期間只保留 `Provisioning` 佔位）。
#[derive(Default)]
pub struct InstanceRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

/// `begin_provision` 的結果
pub enum ProvisionSlot {
    Reserved(ProvisionReservation),
    Existing(ServiceInstance),
}

/// 進行中 Provision 的佔位；未 commit 就被 drop 時會釋放。
/// 持有 registry 的 `Arc`，可以移進背景 task。
pub struct ProvisionReservation {
    registry: Arc<InstanceRegistry>,
    instance_id: String,
    committed: bool,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // 持鎖區段內沒有會 panic 的邏輯，被 poison 時資料仍一致
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 以 `record.instance_id` 為 key 寫入，已存在時直接覆蓋
    pub fn insert(&self, record: ServiceInstance) -> Option<ServiceInstance> {
        Self::insert_into(&mut self.slots(), record)
    }

    fn insert_into(
        slots: &mut HashMap<String, Slot>,
        record: ServiceInstance,
    ) -> Option<ServiceInstance> {
        match slots.insert(record.instance_id.clone(), Slot::Ready(record)) {
            Some(Slot::Ready(old)) => Some(old),
            _ => None,
        }
    }

    pub fn get(&self, instance_id: &str) -> Option<ServiceInstance> {
        match self.slots().get(instance_id) {
            Some(Slot::Ready(record)) => Some(record.clone()),
            _ => None,
        }
    }

    pub fn remove(&self, instance_id: &str) -> Result<ServiceInstance> {
        let mut slots = self.slots();
        match slots.remove(instance_id) {
            Some(Slot::Ready(record)) => Ok(record),
            Some(Slot::Provisioning) => {
                slots.insert(instance_id.to_string(), Slot::Provisioning);
                Err(BrokerError::OperationInProgress {
                    instance_id: instance_id.to_string(),
                })
            }
            None => Err(BrokerError::InstanceNotFound {
                instance_id: instance_id.to_string(),
            }),
        }
    }

    /// 為 Provision 取得佔位。同一 id 同時只允許一個進行中的 Provision。
    pub fn begin_provision(self: &Arc<Self>, instance_id: &str) -> Result<ProvisionSlot> {
        let mut slots = self.slots();
        match slots.get(instance_id) {
            Some(Slot::Ready(record)) => Ok(ProvisionSlot::Existing(record.clone())),
            Some(Slot::Provisioning) => Err(BrokerError::OperationInProgress {
                instance_id: instance_id.to_string(),
            }),
            None => {
                slots.insert(instance_id.to_string(), Slot::Provisioning);
                Ok(ProvisionSlot::Reserved(ProvisionReservation {
                    registry: Arc::clone(self),
                    instance_id: instance_id.to_string(),
                    committed: false,
                }))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依 instance id 排序的完整內容
    pub fn snapshot(&self) -> Vec<ServiceInstance> {
        let mut records: Vec<ServiceInstance> = self
            .slots()
            .values()
            .filter_map(|slot| match slot {
                Slot::Ready(record) => Some(record.clone()),
                Slot::Provisioning => None,
            })
            .collect();
        records.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        records
    }

    /// 以 snapshot 取代現有內容，回傳實際寫入的 instance 數。
    /// 進行中的 Provision 佔位會保留，snapshot 裡相同 id 的紀錄被略過；
    /// 重複的 id 以最後一筆為準，只計算一次。
    pub fn restore(&self, records: Vec<ServiceInstance>) -> usize {
        let mut slots = self.slots();
        slots.retain(|_, slot| matches!(slot, Slot::Provisioning));

        let mut restored = 0;
        for record in records {
            if matches!(slots.get(&record.instance_id), Some(Slot::Provisioning)) {
                tracing::warn!(
                    instance_id = %record.instance_id,
                    "Skipping restored record for an instance that is being provisioned"
                );
                continue;
            }
            if Self::insert_into(&mut slots, record).is_none() {
                restored += 1;
            }
        }
        restored
    }
}

impl ProvisionReservation {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn commit(mut self, record: ServiceInstance) {
        debug_assert_eq!(record.instance_id, self.instance_id);
        self.registry
            .slots()
            .insert(self.instance_id.clone(), Slot::Ready(record));
        self.committed = true;
    }
}

impl Drop for ProvisionReservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut slots = self.registry.slots();
        if matches!(slots.get(&self.instance_id), Some(Slot::Provisioning)) {
            slots.remove(&self.instance_id);
        }
    }
}
